use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::consent::ConsentSettings;
use crate::platform::browser::BrowserContext;
use crate::tag_manager::config::{ConsentUpdateMode, GtmConfig};
use crate::tag_manager::constants::{events, DEFAULT_DATA_LAYER_NAME};
use crate::tag_manager::data_layer::{consent_command, ConsentDirective, GtmEvent};
use crate::tag_manager::dedupe::LastValueGate;

/// Writes events and consent directives to the page's data layer.
///
/// Every operation is a silent no-op when the sink has no browser context, so the same code runs
/// during server-side rendering. Clones share the same consent de-duplication state.
#[derive(Clone)]
pub struct EventSink {
    inner: Arc<SinkInner>,
}

struct SinkInner {
    browser: Option<Arc<dyn BrowserContext>>,
    data_layer_name: String,
    consent_update_mode: ConsentUpdateMode,
    debug: bool,
    last_consent: Mutex<LastValueGate<Value>>,
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("attached", &self.is_attached())
            .field("data_layer", &self.inner.data_layer_name)
            .field("consent_update_mode", &self.inner.consent_update_mode)
            .finish()
    }
}

impl EventSink {
    pub fn new(browser: Option<Arc<dyn BrowserContext>>) -> Self {
        Self::build(
            browser,
            DEFAULT_DATA_LAYER_NAME.to_string(),
            ConsentUpdateMode::default(),
            false,
        )
    }

    pub fn from_config(config: &GtmConfig, browser: Option<Arc<dyn BrowserContext>>) -> Self {
        Self::build(
            browser,
            config.data_layer_name.clone(),
            config.consent_update_mode,
            config.debug,
        )
    }

    /// A sink with no browser context; everything it is asked to do is dropped.
    pub fn detached() -> Self {
        Self::new(None)
    }

    fn build(
        browser: Option<Arc<dyn BrowserContext>>,
        data_layer_name: String,
        consent_update_mode: ConsentUpdateMode,
        debug: bool,
    ) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                browser,
                data_layer_name,
                consent_update_mode,
                debug,
                last_consent: Mutex::new(LastValueGate::by_eq()),
            }),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.browser.is_some()
    }

    pub fn data_layer_name(&self) -> &str {
        &self.inner.data_layer_name
    }

    pub(crate) fn browser(&self) -> Option<&Arc<dyn BrowserContext>> {
        self.inner.browser.as_ref()
    }

    /// Appends `{event: name, ...params}` to the data layer.
    pub fn push_event(&self, name: &str, params: Map<String, Value>) {
        self.push(GtmEvent::new(name).with_params(params));
    }

    pub fn push(&self, event: GtmEvent) {
        let Some(browser) = self.browser() else {
            return;
        };
        if event.name.trim().is_empty() {
            log::warn!("dropping data layer event with an empty name");
            return;
        }
        browser.push_data_layer(&self.inner.data_layer_name, event.to_value());
        self.trace(format_args!("event pushed: {} {:?}", event.name, event.params));
    }

    /// Pushes a `page_view` event. `url` and `title` default to the current document's values;
    /// `page_path` always reflects the current location.
    pub fn push_page_view(&self, url: Option<&str>, title: Option<&str>) {
        let Some(browser) = self.browser() else {
            return;
        };
        let location = browser.location();
        let page_location = url.map(str::to_string).unwrap_or(location.href);
        let page_title = title
            .map(str::to_string)
            .unwrap_or_else(|| browser.document_title());

        self.push(
            GtmEvent::new(events::PAGE_VIEW)
                .with_param("page_location", page_location)
                .with_param("page_title", page_title)
                .with_param("page_path", location.pathname),
        );
    }

    /// Sends `gtag('consent', 'update', settings)` unless `settings` equals the last update sent
    /// through this sink. Returns whether the update was forwarded.
    pub fn update_consent(&self, settings: &ConsentSettings) -> bool {
        let Some(browser) = self.browser() else {
            return false;
        };
        let payload = settings.to_json_map();
        if !self
            .inner
            .last_consent
            .lock()
            .unwrap()
            .admit(Value::Object(payload.clone()))
        {
            log::debug!("consent unchanged; skipping update");
            return false;
        }

        browser.gtag(
            &self.inner.data_layer_name,
            consent_command(ConsentDirective::Update, payload.clone()),
        );
        if self.inner.consent_update_mode == ConsentUpdateMode::DirectiveAndEvent {
            self.push(GtmEvent::new(events::CONSENT_UPDATE).with_params(payload));
        }
        self.trace(format_args!("consent updated: {}", settings.to_json()));
        true
    }

    /// Records default consent ahead of the container loading: a `consent_default` event followed
    /// by `gtag('consent', 'default', defaults)`.
    pub fn initialize_consent(&self, defaults: &ConsentSettings) {
        let Some(browser) = self.browser() else {
            return;
        };
        let payload = defaults.to_json_map();
        self.push(
            GtmEvent::new(events::CONSENT_DEFAULT)
                .with_param("consent", "default")
                .with_params(payload.clone()),
        );
        browser.gtag(
            &self.inner.data_layer_name,
            consent_command(ConsentDirective::Default, payload),
        );
        self.trace(format_args!("consent defaults initialized: {}", defaults.to_json()));
    }

    fn trace(&self, message: fmt::Arguments<'_>) {
        if self.inner.debug {
            log::info!("{message}");
        } else {
            log::debug!("{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::{ConsentMode, ConsentType};
    use crate::platform::browser::MemoryBrowser;
    use crate::tag_manager::data_layer::as_consent_command;
    use serde_json::json;

    fn attached() -> (Arc<MemoryBrowser>, EventSink) {
        let browser = Arc::new(MemoryBrowser::with_location("https://example.test/pricing?plan=pro").unwrap());
        browser.set_title("Pricing");
        let sink = EventSink::new(Some(browser.clone() as Arc<dyn BrowserContext>));
        (browser, sink)
    }

    fn consent_updates(browser: &MemoryBrowser) -> usize {
        browser
            .gtag_calls()
            .into_iter()
            .filter(|args| {
                as_consent_command(&Value::Array(args.clone()))
                    .is_some_and(|(directive, _)| directive == ConsentDirective::Update)
            })
            .count()
    }

    #[test]
    fn push_event_creates_data_layer_and_appends_in_order() {
        let (browser, sink) = attached();
        assert!(!browser.has_data_layer("dataLayer"));

        let mut params = Map::new();
        params.insert("label".into(), json!("signup"));
        sink.push_event("button_click", params);
        sink.push_event("scroll_depth", Map::new());

        assert_eq!(
            browser.data_layer("dataLayer"),
            vec![
                json!({"event": "button_click", "label": "signup"}),
                json!({"event": "scroll_depth"}),
            ]
        );
    }

    #[test]
    fn empty_event_names_are_dropped() {
        let (browser, sink) = attached();
        sink.push_event("  ", Map::new());
        assert!(browser.data_layer("dataLayer").is_empty());
    }

    #[test]
    fn page_view_defaults_to_current_document() {
        let (browser, sink) = attached();
        sink.push_page_view(None, None);
        sink.push_page_view(Some("/checkout"), Some("Checkout"));

        let layer = browser.data_layer("dataLayer");
        assert_eq!(
            layer[0],
            json!({
                "event": "page_view",
                "page_location": "https://example.test/pricing?plan=pro",
                "page_title": "Pricing",
                "page_path": "/pricing"
            })
        );
        assert_eq!(layer[1]["page_location"], "/checkout");
        assert_eq!(layer[1]["page_title"], "Checkout");
        assert_eq!(layer[1]["page_path"], "/pricing");
    }

    #[test]
    fn identical_consent_updates_reach_gtag_once() {
        let (browser, sink) = attached();
        let settings = ConsentSettings::all_granted();

        assert!(sink.update_consent(&settings));
        assert!(!sink.update_consent(&settings));
        assert_eq!(consent_updates(&browser), 1);

        let changed = settings.with(ConsentType::AdStorage, ConsentMode::Denied);
        assert!(sink.update_consent(&changed));
        assert!(sink.update_consent(&settings));
        assert_eq!(consent_updates(&browser), 3);
    }

    #[test]
    fn clones_share_consent_history() {
        let (browser, sink) = attached();
        let other = sink.clone();
        sink.update_consent(&ConsentSettings::all_granted());
        other.update_consent(&ConsentSettings::all_granted());
        assert_eq!(consent_updates(&browser), 1);
    }

    #[test]
    fn directive_only_mode_pushes_no_consent_event() {
        let (browser, sink) = attached();
        sink.update_consent(&ConsentSettings::all_granted());
        let layer = browser.data_layer("dataLayer");
        assert_eq!(layer.len(), 1);
        assert!(layer[0].is_array());
    }

    #[test]
    fn directive_and_event_mode_also_pushes_event() {
        let browser = Arc::new(MemoryBrowser::new());
        let config = GtmConfig::new("GTM-TEST")
            .with_consent_update_mode(ConsentUpdateMode::DirectiveAndEvent);
        let sink = EventSink::from_config(&config, Some(browser.clone() as Arc<dyn BrowserContext>));

        sink.update_consent(&ConsentSettings::all_granted());
        let layer = browser.data_layer("dataLayer");
        assert_eq!(layer.len(), 2);
        assert_eq!(layer[1]["event"], "consent_update");
        assert_eq!(layer[1]["ad_storage"], "granted");
        assert_eq!(consent_updates(&browser), 1);
    }

    #[test]
    fn initialize_consent_pushes_record_then_directive() {
        let (browser, sink) = attached();
        sink.initialize_consent(&ConsentSettings::default());

        let layer = browser.data_layer("dataLayer");
        assert_eq!(layer.len(), 2);
        assert_eq!(layer[0]["event"], "consent_default");
        assert_eq!(layer[0]["consent"], "default");
        assert_eq!(layer[0]["analytics_storage"], "denied");
        assert_eq!(layer[0]["security_storage"], "granted");
        let (directive, settings) = as_consent_command(&layer[1]).unwrap();
        assert_eq!(directive, ConsentDirective::Default);
        assert_eq!(settings, &ConsentSettings::default().to_json_map());
    }

    #[test]
    fn custom_data_layer_name_is_used() {
        let browser = Arc::new(MemoryBrowser::new());
        let config = GtmConfig::new("GTM-TEST").with_data_layer_name("tagQueue");
        let sink = EventSink::from_config(&config, Some(browser.clone() as Arc<dyn BrowserContext>));
        sink.push_event("video_play", Map::new());
        assert!(browser.data_layer("dataLayer").is_empty());
        assert_eq!(browser.data_layer("tagQueue").len(), 1);
    }

    #[test]
    fn detached_sink_is_a_silent_no_op() {
        let sink = EventSink::detached();
        assert!(!sink.is_attached());
        sink.push_event("button_click", Map::new());
        sink.push_page_view(Some("/"), None);
        assert!(!sink.update_consent(&ConsentSettings::all_granted()));
        sink.initialize_consent(&ConsentSettings::default());
    }
}
