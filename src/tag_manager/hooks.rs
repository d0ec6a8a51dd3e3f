use serde_json::{Map, Value};

use crate::consent::ConsentSettings;
use crate::tag_manager::constants::events;
use crate::tag_manager::error::{missing_provider, GtmResult};
use crate::tag_manager::provider::GtmContext;

/// Returns the provider context, or `gtm/missing-provider` when there is none.
pub fn use_gtm_context(context: Option<&GtmContext>) -> GtmResult<GtmContext> {
    context
        .cloned()
        .ok_or_else(|| missing_provider("use_gtm_context"))
}

pub fn use_gtm(context: Option<&GtmContext>) -> GtmResult<UseGtm> {
    let context = context.ok_or_else(|| missing_provider("use_gtm"))?;
    Ok(UseGtm {
        context: context.clone(),
    })
}

/// Tracking helpers for code running under a mounted provider.
#[derive(Clone, Debug)]
pub struct UseGtm {
    context: GtmContext,
}

impl UseGtm {
    pub fn context(&self) -> &GtmContext {
        &self.context
    }

    pub fn push_event(&self, name: &str, params: Map<String, Value>) {
        self.context.push_event(name, params);
    }

    pub fn push_page_view(&self, url: Option<&str>, title: Option<&str>) {
        self.context.push_page_view(url, title);
    }

    pub fn update_consent(&self, settings: &ConsentSettings) -> bool {
        self.context.update_consent(settings)
    }

    pub fn track_button_click(&self, label: &str, value: Option<Value>) {
        let mut params = Map::new();
        params.insert("label".to_string(), Value::String(label.to_string()));
        if let Some(value) = value {
            params.insert("value".to_string(), value);
        }
        self.push_event(events::BUTTON_CLICK, params);
    }

    pub fn track_form_submit(&self, form_name: &str, form_data: Option<Map<String, Value>>) {
        let mut params = Map::new();
        params.insert("form_name".to_string(), Value::String(form_name.to_string()));
        if let Some(data) = form_data {
            params.insert("form_data".to_string(), Value::Object(data));
        }
        self.push_event(events::FORM_SUBMIT, params);
    }

    pub fn track_file_download(&self, file_name: &str, file_type: &str) {
        let mut params = Map::new();
        params.insert("file_name".to_string(), Value::String(file_name.to_string()));
        params.insert("file_type".to_string(), Value::String(file_type.to_string()));
        self.push_event(events::FILE_DOWNLOAD, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mounted_provider;
    use serde_json::json;

    #[test]
    fn hooks_require_a_provider() {
        let err = use_gtm(None).unwrap_err();
        assert_eq!(err.code_str(), "gtm/missing-provider");
        assert!(err.message().contains("use_gtm"));
        assert!(use_gtm_context(None).is_err());
    }

    #[test]
    fn context_hook_returns_provider_context() {
        let (_, provider) = mounted_provider("GTM-HOOKS");
        let context = use_gtm_context(Some(&provider.context())).unwrap();
        assert_eq!(context.gtm_id(), "GTM-HOOKS");
    }

    #[test]
    fn track_helpers_push_named_events() {
        let (browser, provider) = mounted_provider("GTM-HOOKS");
        let gtm = use_gtm(Some(&provider.context())).unwrap();

        gtm.track_button_click("signup", Some(json!(3)));
        gtm.track_button_click("close", None);
        let mut form = Map::new();
        form.insert("plan".into(), json!("pro"));
        gtm.track_form_submit("checkout", Some(form));
        gtm.track_file_download("report.pdf", "pdf");

        let layer = browser.data_layer("dataLayer");
        let tail = &layer[layer.len() - 4..];
        assert_eq!(tail[0], json!({"event": "button_click", "label": "signup", "value": 3}));
        assert_eq!(tail[1], json!({"event": "button_click", "label": "close"}));
        assert_eq!(
            tail[2],
            json!({"event": "form_submit", "form_name": "checkout", "form_data": {"plan": "pro"}})
        );
        assert_eq!(
            tail[3],
            json!({"event": "file_download", "file_name": "report.pdf", "file_type": "pdf"})
        );
    }
}
