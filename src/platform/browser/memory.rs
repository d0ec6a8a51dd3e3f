use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

use super::cookies::{CookieJar, MemoryCookieJar};
use super::{BrowserContext, LoaderScript, PageLocation, ScriptLoadCallback};
use crate::tag_manager::error::GtmResult;

const DEFAULT_HREF: &str = "http://localhost/";

/// In-process page model: data layers, `gtag` calls, cookies and injected scripts are recorded so
/// they can be inspected. Script loads stay pending until [`MemoryBrowser::complete_script_loads`].
pub struct MemoryBrowser {
    location: Mutex<PageLocation>,
    title: Mutex<String>,
    data_layers: Mutex<BTreeMap<String, Vec<Value>>>,
    gtag_calls: Mutex<Vec<Vec<Value>>>,
    cookies: MemoryCookieJar,
    scripts: Mutex<Vec<LoaderScript>>,
    pending_loads: Mutex<Vec<ScriptLoadCallback>>,
}

impl Default for MemoryBrowser {
    fn default() -> Self {
        Self {
            location: Mutex::new(PageLocation {
                href: DEFAULT_HREF.to_string(),
                pathname: "/".to_string(),
                search: String::new(),
            }),
            title: Mutex::new(String::new()),
            data_layers: Mutex::new(BTreeMap::new()),
            gtag_calls: Mutex::new(Vec::new()),
            cookies: MemoryCookieJar::new(),
            scripts: Mutex::new(Vec::new()),
            pending_loads: Mutex::new(Vec::new()),
        }
    }
}

impl MemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(href: &str) -> GtmResult<Self> {
        let browser = Self::default();
        browser.navigate(href)?;
        Ok(browser)
    }

    pub fn navigate(&self, href: &str) -> GtmResult<()> {
        *self.location.lock().unwrap() = PageLocation::parse(href)?;
        Ok(())
    }

    pub fn set_title(&self, title: impl Into<String>) {
        *self.title.lock().unwrap() = title.into();
    }

    /// Snapshot of the named data layer; empty when nothing was pushed yet.
    pub fn data_layer(&self, name: &str) -> Vec<Value> {
        self.data_layers
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_data_layer(&self, name: &str) -> bool {
        self.data_layers.lock().unwrap().contains_key(name)
    }

    /// Argument lists of every `gtag(...)` invocation, in call order.
    pub fn gtag_calls(&self) -> Vec<Vec<Value>> {
        self.gtag_calls.lock().unwrap().clone()
    }

    pub fn cookie_jar(&self) -> &MemoryCookieJar {
        &self.cookies
    }

    pub fn injected_scripts(&self) -> Vec<LoaderScript> {
        self.scripts.lock().unwrap().clone()
    }

    /// Fires the load callbacks of every script injected so far. Returns how many fired.
    pub fn complete_script_loads(&self) -> usize {
        let callbacks = std::mem::take(&mut *self.pending_loads.lock().unwrap());
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        count
    }
}

impl BrowserContext for MemoryBrowser {
    fn location(&self) -> PageLocation {
        self.location.lock().unwrap().clone()
    }

    fn document_title(&self) -> String {
        self.title.lock().unwrap().clone()
    }

    fn push_data_layer(&self, data_layer: &str, entry: Value) {
        self.data_layers
            .lock()
            .unwrap()
            .entry(data_layer.to_string())
            .or_default()
            .push(entry);
    }

    fn gtag(&self, data_layer: &str, args: Vec<Value>) {
        self.gtag_calls.lock().unwrap().push(args.clone());
        self.push_data_layer(data_layer, Value::Array(args));
    }

    fn cookies(&self) -> &dyn CookieJar {
        &self.cookies
    }

    fn inject_script(&self, script: LoaderScript, on_load: ScriptLoadCallback) -> GtmResult<()> {
        self.scripts.lock().unwrap().push(script);
        self.pending_loads.lock().unwrap().push(on_load);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn gtag_shim_queues_arguments_on_data_layer() {
        let browser = MemoryBrowser::new();
        browser.gtag("dataLayer", vec![json!("consent"), json!("update"), json!({})]);

        assert_eq!(browser.gtag_calls().len(), 1);
        assert_eq!(
            browser.data_layer("dataLayer"),
            vec![json!(["consent", "update", {}])]
        );
    }

    #[test]
    fn script_loads_complete_on_demand() {
        let browser = MemoryBrowser::new();
        let loaded = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&loaded);
        browser
            .inject_script(
                LoaderScript {
                    id: "gtm-script".into(),
                    src: "https://example.test/gtm.js".into(),
                    nonce: None,
                    is_async: true,
                },
                Box::new(move || flag.store(true, Ordering::SeqCst)),
            )
            .unwrap();

        assert!(!loaded.load(Ordering::SeqCst));
        assert_eq!(browser.complete_script_loads(), 1);
        assert!(loaded.load(Ordering::SeqCst));
        assert_eq!(browser.complete_script_loads(), 0);
    }

    #[test]
    fn navigate_updates_location() {
        let browser = MemoryBrowser::with_location("https://example.test/a").unwrap();
        browser.navigate("https://example.test/b?x=1").unwrap();
        let location = browser.location();
        assert_eq!(location.pathname, "/b");
        assert_eq!(location.search, "?x=1");
    }
}
