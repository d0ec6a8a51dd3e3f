use std::fmt;
use std::sync::{Arc, Mutex};

use crate::consent::constants::{COOKIE_EXPIRY_DAYS, COOKIE_NAME};
use crate::consent::record::ConsentRecord;
use crate::consent::types::{ConsentSettings, ConsentStatus, PartialConsent};
use crate::platform::browser::{BrowserContext, CookieOptions};
use crate::tag_manager::error::{missing_provider, GtmResult};
use crate::tag_manager::{EventSink, GtmContext};

/// Where and how the consent decision is persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsentStoreOptions {
    pub cookie_name: String,
    pub cookie: CookieOptions,
    /// Settings reported while no decision is stored.
    pub defaults: ConsentSettings,
}

impl Default for ConsentStoreOptions {
    fn default() -> Self {
        Self {
            cookie_name: COOKIE_NAME.to_string(),
            cookie: CookieOptions::default().with_expiry_days(COOKIE_EXPIRY_DAYS),
            defaults: ConsentSettings::default(),
        }
    }
}

/// In-memory view of the visitor's consent decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsentSnapshot {
    pub status: ConsentStatus,
    pub settings: ConsentSettings,
}

/// Consent state backed by a cookie and mirrored to the tag manager.
///
/// Clones share state. Every mutation writes the cookie before forwarding the new settings to
/// the sink, which drops updates identical to the last one it sent. The cookie is read and written
/// through the store's own browser handle, so a detached sink still leaves the decision persisted.
#[derive(Clone)]
pub struct ConsentStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    options: ConsentStoreOptions,
    browser: Option<Arc<dyn BrowserContext>>,
    sink: EventSink,
    snapshot: Mutex<ConsentSnapshot>,
}

impl fmt::Debug for ConsentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentStore")
            .field("cookie_name", &self.inner.options.cookie_name)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl ConsentStore {
    /// Reads the stored decision and replays it to `sink`. Cookies go through the sink's browser.
    pub fn new(options: ConsentStoreOptions, sink: EventSink) -> Self {
        let browser = sink.browser().cloned();
        Self::with_browser(options, sink, browser)
    }

    /// Like [`ConsentStore::new`], with cookies kept in `browser` regardless of the sink.
    pub fn with_browser(
        options: ConsentStoreOptions,
        sink: EventSink,
        browser: Option<Arc<dyn BrowserContext>>,
    ) -> Self {
        let store = Self {
            inner: Arc::new(StoreInner {
                snapshot: Mutex::new(ConsentSnapshot {
                    status: ConsentStatus::Pending,
                    settings: options.defaults,
                }),
                options,
                browser,
                sink,
            }),
        };
        store.initial_consent();
        store
    }

    /// Loads the cookie into memory. A stored decision is forwarded to the sink; a missing or
    /// malformed cookie leaves the store pending with default settings.
    pub fn initial_consent(&self) -> ConsentSnapshot {
        let snapshot = match self.read_record() {
            Some(record) => {
                self.inner.sink.update_consent(&record.settings);
                ConsentSnapshot {
                    status: record.status,
                    settings: record.settings,
                }
            }
            None => ConsentSnapshot {
                status: ConsentStatus::Pending,
                settings: self.inner.options.defaults,
            },
        };
        *self.inner.snapshot.lock().unwrap() = snapshot;
        snapshot
    }

    pub fn snapshot(&self) -> ConsentSnapshot {
        *self.inner.snapshot.lock().unwrap()
    }

    pub fn status(&self) -> ConsentStatus {
        self.snapshot().status
    }

    pub fn settings(&self) -> ConsentSettings {
        self.snapshot().settings
    }

    /// `true` once the visitor has made any decision.
    pub fn is_consent_given(&self) -> bool {
        !self.status().is_pending()
    }

    pub fn accept_all(&self) -> GtmResult<()> {
        self.save_consent(ConsentStatus::Accepted, ConsentSettings::all_granted())
    }

    pub fn reject_all(&self) -> GtmResult<()> {
        self.save_consent(ConsentStatus::Rejected, ConsentSettings::necessary_only())
    }

    /// Overrides the categories in `partial`, keeping the rest of the current settings.
    pub fn update_partial(&self, partial: &PartialConsent) -> GtmResult<()> {
        let merged = self.settings().merge(partial);
        self.save_consent(ConsentStatus::Partial, merged)
    }

    /// Forgets the stored decision. No consent update is sent.
    pub fn clear(&self) -> GtmResult<()> {
        if let Some(browser) = self.browser() {
            browser
                .cookies()
                .remove(&self.inner.options.cookie_name, &self.inner.options.cookie)?;
        }
        *self.inner.snapshot.lock().unwrap() = ConsentSnapshot {
            status: ConsentStatus::Pending,
            settings: self.inner.options.defaults,
        };
        log::debug!("consent cleared");
        Ok(())
    }

    fn save_consent(&self, status: ConsentStatus, settings: ConsentSettings) -> GtmResult<()> {
        let record = ConsentRecord::new(status, settings);
        if let Some(browser) = self.browser() {
            browser.cookies().set(
                &self.inner.options.cookie_name,
                &record.encode()?,
                &self.inner.options.cookie,
            )?;
        }
        *self.inner.snapshot.lock().unwrap() = ConsentSnapshot { status, settings };
        self.inner.sink.update_consent(&settings);
        log::debug!("consent saved with status {status}");
        Ok(())
    }

    fn read_record(&self) -> Option<ConsentRecord> {
        let browser = self.browser()?;
        let raw = browser.cookies().get(&self.inner.options.cookie_name)?;
        match ConsentRecord::decode(&raw) {
            Ok(record) if record.status.is_pending() => None,
            Ok(record) => Some(record),
            Err(err) => {
                log::warn!(
                    "ignoring malformed consent cookie `{}`: {err}",
                    self.inner.options.cookie_name
                );
                None
            }
        }
    }

    fn browser(&self) -> Option<&Arc<dyn BrowserContext>> {
        self.inner.browser.as_ref()
    }
}

/// Consent store bound to the provider's cookie settings and sink.
pub fn use_cookie_consent(context: Option<&GtmContext>) -> GtmResult<ConsentStore> {
    let context = context.ok_or_else(|| missing_provider("use_cookie_consent"))?;
    let options = ConsentStoreOptions {
        cookie_name: context.cookie_name().to_string(),
        cookie: context.cookie_options(),
        defaults: context.provider().config().default_consent,
    };
    Ok(ConsentStore::with_browser(
        options,
        context.sink().clone(),
        context.provider().browser().cloned(),
    ))
}
