use crate::platform::browser::PageLocation;
use crate::tag_manager::{use_gtm, GtmContext, GtmResult, LastValueGate, UseGtm};

/// Sends a page view whenever the pathname changes.
///
/// The pathname seen on mount is recorded as a baseline and not reported; the container's own
/// `gtm.js` pageview covers the initial load.
#[derive(Debug)]
pub struct RouteChangeListener {
    gtm: UseGtm,
    last: LastValueGate<String>,
}

impl RouteChangeListener {
    pub fn new(context: Option<&GtmContext>) -> GtmResult<Self> {
        Ok(Self {
            gtm: use_gtm(context)?,
            last: LastValueGate::by_eq().with_baseline(),
        })
    }

    /// Reports the current pathname. Returns whether a page view was pushed.
    pub fn observe(&mut self, pathname: &str) -> bool {
        if !self.last.admit(pathname.to_string()) {
            return false;
        }
        self.gtm.push_page_view(Some(pathname), None);
        true
    }

    pub fn observe_location(&mut self, location: &PageLocation) -> bool {
        self.observe(&location.pathname)
    }
}

/// Like [`RouteChangeListener`], but a change in the query string also counts as navigation.
#[derive(Debug)]
pub struct RouteChangeListenerWithParams {
    gtm: UseGtm,
    last: LastValueGate<String>,
}

impl RouteChangeListenerWithParams {
    pub fn new(context: Option<&GtmContext>) -> GtmResult<Self> {
        Ok(Self {
            gtm: use_gtm(context)?,
            last: LastValueGate::by_eq().with_baseline(),
        })
    }

    /// `search` may be given with or without its leading `?`.
    pub fn observe(&mut self, pathname: &str, search: &str) -> bool {
        let url = page_url(pathname, search);
        if !self.last.admit(url.clone()) {
            return false;
        }
        self.gtm.push_page_view(Some(&url), None);
        true
    }

    pub fn observe_location(&mut self, location: &PageLocation) -> bool {
        self.observe(&location.pathname, &location.search)
    }
}

fn page_url(pathname: &str, search: &str) -> String {
    let query = search.strip_prefix('?').unwrap_or(search);
    if query.is_empty() {
        pathname.to_string()
    } else {
        format!("{pathname}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::browser::{BrowserContext, MemoryBrowser};
    use crate::test_support::mounted_provider;
    use serde_json::Value;

    fn page_views(browser: &MemoryBrowser) -> Vec<Value> {
        browser
            .data_layer("dataLayer")
            .into_iter()
            .filter(|entry| entry["event"] == "page_view")
            .map(|entry| entry["page_location"].clone())
            .collect()
    }

    #[test]
    fn first_pathname_is_a_baseline() {
        let (browser, provider) = mounted_provider("GTM-ROUTES");
        let mut listener = RouteChangeListener::new(Some(&provider.context())).unwrap();

        assert!(!listener.observe("/"));
        assert!(page_views(&browser).is_empty());

        assert!(listener.observe("/pricing"));
        assert!(!listener.observe("/pricing"));
        assert!(listener.observe("/"));
        assert_eq!(page_views(&browser), vec![Value::from("/pricing"), Value::from("/")]);
    }

    #[test]
    fn pathname_listener_ignores_query_changes() {
        let (browser, provider) = mounted_provider("GTM-ROUTES");
        let mut listener = RouteChangeListener::new(Some(&provider.context())).unwrap();
        browser.navigate("http://localhost/docs?page=1").unwrap();
        listener.observe_location(&browser.location());
        browser.navigate("http://localhost/docs?page=2").unwrap();
        assert!(!listener.observe_location(&browser.location()));
        assert!(page_views(&browser).is_empty());
    }

    #[test]
    fn params_listener_reports_query_changes() {
        let (browser, provider) = mounted_provider("GTM-ROUTES");
        let mut listener = RouteChangeListenerWithParams::new(Some(&provider.context())).unwrap();

        assert!(!listener.observe("/search", "?q=rust"));
        assert!(listener.observe("/search", "q=wasm"));
        assert!(!listener.observe("/search", "?q=wasm"));
        assert!(listener.observe("/search", ""));
        assert_eq!(
            page_views(&browser),
            vec![Value::from("/search?q=wasm"), Value::from("/search")]
        );
    }

    #[test]
    fn listeners_require_a_provider() {
        assert!(RouteChangeListener::new(None).is_err());
        assert!(RouteChangeListenerWithParams::new(None).is_err());
    }
}
