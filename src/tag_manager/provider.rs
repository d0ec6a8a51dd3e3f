use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::consent::ConsentSettings;
use crate::platform::browser::{self, BrowserContext, CookieOptions, LoaderScript};
use crate::platform::environment::{self, BuildMode};
use crate::tag_manager::config::GtmConfig;
use crate::tag_manager::constants::{events, GTM_SCRIPT_ELEMENT_ID};
use crate::tag_manager::data_layer::GtmEvent;
use crate::tag_manager::error::GtmResult;
use crate::tag_manager::sink::EventSink;
use crate::util::escape_html;

/// Progress of the container bootstrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapState {
    NotInitialized,
    ConsentInitialized,
    ScriptLoading,
    Loaded,
}

/// Composition root for the tag manager integration.
///
/// Owns the event sink, the bootstrap state and the one-shot mount latch. Mounting records the
/// default consent first and only then injects the container script, so the container never
/// observes an empty consent state.
#[derive(Clone)]
pub struct GtmProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    config: GtmConfig,
    build_mode: BuildMode,
    browser: Option<Arc<dyn BrowserContext>>,
    sink: EventSink,
    enabled: bool,
    mounted: AtomicBool,
    state: Arc<Mutex<BootstrapState>>,
}

impl fmt::Debug for GtmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GtmProvider")
            .field("gtm_id", &self.inner.config.gtm_id)
            .field("build_mode", &self.inner.build_mode)
            .field("enabled", &self.inner.enabled)
            .field("state", &self.state())
            .finish()
    }
}

impl GtmProvider {
    /// Creates a provider using the build mode resolved from the environment.
    pub fn new(config: GtmConfig, browser: Option<Arc<dyn BrowserContext>>) -> GtmResult<Self> {
        Self::with_build_mode(config, browser, environment::build_mode())
    }

    /// Creates a provider bound to the current page, if there is one.
    pub fn for_current_page(config: GtmConfig) -> GtmResult<Self> {
        Self::new(config, browser::detect())
    }

    pub fn with_build_mode(
        config: GtmConfig,
        browser: Option<Arc<dyn BrowserContext>>,
        build_mode: BuildMode,
    ) -> GtmResult<Self> {
        config.validate()?;
        let enabled = browser.is_some() && config.should_load(build_mode);
        // A disabled provider hands out a detached sink: nothing reaches the page.
        let sink = EventSink::from_config(&config, browser.clone().filter(|_| enabled));
        Ok(Self {
            inner: Arc::new(ProviderInner {
                config,
                build_mode,
                browser,
                sink,
                enabled,
                mounted: AtomicBool::new(false),
                state: Arc::new(Mutex::new(BootstrapState::NotInitialized)),
            }),
        })
    }

    pub fn config(&self) -> &GtmConfig {
        &self.inner.config
    }

    pub fn build_mode(&self) -> BuildMode {
        self.inner.build_mode
    }

    /// `false` outside production (unless opted in) or without a browser context.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    pub fn state(&self) -> BootstrapState {
        *self.inner.state.lock().unwrap()
    }

    pub fn sink(&self) -> &EventSink {
        &self.inner.sink
    }

    /// The page this provider was created for, whether or not it is enabled.
    pub(crate) fn browser(&self) -> Option<&Arc<dyn BrowserContext>> {
        self.inner.browser.as_ref()
    }

    pub fn context(&self) -> GtmContext {
        GtmContext {
            provider: self.clone(),
        }
    }

    /// Runs the bootstrap once. Later calls, including from clones, only report the state.
    pub fn mount(&self) -> BootstrapState {
        if !self.inner.enabled {
            log::debug!(
                "tag manager disabled (build mode {}, browser: {})",
                self.inner.build_mode,
                self.inner.browser.is_some()
            );
            return self.state();
        }
        if self.inner.mounted.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        let defaults = self.inner.config.default_consent;
        self.inner.sink.initialize_consent(&defaults);
        self.transition(BootstrapState::ConsentInitialized);
        self.trace(format_args!("consent initialized with {}", defaults.to_json()));

        if self.state() == BootstrapState::ConsentInitialized {
            self.load_container();
        }
        self.state()
    }

    /// The `<script>` element that loads the container.
    pub fn loader_script(&self) -> GtmResult<LoaderScript> {
        Ok(LoaderScript {
            id: GTM_SCRIPT_ELEMENT_ID.to_string(),
            src: self.inner.config.loader_script_url()?,
            nonce: self.inner.config.nonce.clone(),
            is_async: true,
        })
    }

    /// `<noscript>` iframe fallback for the container, or `None` while disabled.
    pub fn noscript_html(&self) -> GtmResult<Option<String>> {
        if !self.inner.enabled {
            return Ok(None);
        }
        let src = self.inner.config.noscript_url()?;
        Ok(Some(format!(
            "<noscript><iframe src=\"{}\" height=\"0\" width=\"0\" \
             style=\"display:none;visibility:hidden\"></iframe></noscript>",
            escape_html(&src)
        )))
    }

    fn load_container(&self) {
        let Some(browser) = self.inner.sink.browser() else {
            return;
        };
        let script = match self.loader_script() {
            Ok(script) => script,
            Err(err) => {
                log::warn!("tag manager script not injected: {err}");
                return;
            }
        };

        self.inner.sink.push(
            GtmEvent::new(events::GTM_JS).with_param("gtm.start", Utc::now().timestamp_millis()),
        );
        self.transition(BootstrapState::ScriptLoading);

        let state = Arc::clone(&self.inner.state);
        let on_load = Box::new(move || {
            let mut guard = state.lock().unwrap();
            if *guard == BootstrapState::ScriptLoading {
                *guard = BootstrapState::Loaded;
            }
            log::debug!("tag manager container loaded");
        });

        let src = script.src.clone();
        match browser.inject_script(script, on_load) {
            Ok(()) => self.trace(format_args!("loading tag manager from {src}")),
            Err(err) => {
                log::warn!("failed to inject tag manager script: {err}");
                self.transition(BootstrapState::ConsentInitialized);
            }
        }
    }

    fn transition(&self, next: BootstrapState) {
        *self.inner.state.lock().unwrap() = next;
    }

    fn trace(&self, message: fmt::Arguments<'_>) {
        if self.inner.config.debug {
            log::info!("{message}");
        } else {
            log::debug!("{message}");
        }
    }
}

/// What hooks receive from a mounted provider.
///
/// Events and page views are dropped until consent defaults have been recorded; consent updates
/// are always forwarded.
#[derive(Clone, Debug)]
pub struct GtmContext {
    provider: GtmProvider,
}

impl GtmContext {
    pub fn gtm_id(&self) -> &str {
        &self.provider.inner.config.gtm_id
    }

    pub fn is_consent_initialized(&self) -> bool {
        self.provider.state() != BootstrapState::NotInitialized
    }

    pub fn provider(&self) -> &GtmProvider {
        &self.provider
    }

    pub fn sink(&self) -> &EventSink {
        self.provider.sink()
    }

    pub fn push_event(&self, name: &str, params: Map<String, Value>) {
        if self.accepts_events() {
            self.sink().push_event(name, params);
        }
    }

    pub fn push_page_view(&self, url: Option<&str>, title: Option<&str>) {
        if self.accepts_events() {
            self.sink().push_page_view(url, title);
        }
    }

    pub fn update_consent(&self, settings: &ConsentSettings) -> bool {
        self.sink().update_consent(settings)
    }

    pub(crate) fn cookie_name(&self) -> &str {
        &self.provider.inner.config.cookie_name
    }

    pub(crate) fn cookie_options(&self) -> CookieOptions {
        self.provider.inner.config.cookie_options()
    }

    fn accepts_events(&self) -> bool {
        self.provider.is_enabled() && self.is_consent_initialized()
    }
}
