//! Browser capabilities needed by the tag manager, behind a trait so server-side rendering and
//! tests can run without a DOM.

pub mod cookies;
mod memory;
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub mod web;

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::tag_manager::error::{invalid_argument, GtmResult};

pub use cookies::{CookieJar, CookieOptions, MemoryCookieJar, SameSite};
pub use memory::MemoryBrowser;

/// Invoked once the injected loader script has finished loading.
pub type ScriptLoadCallback = Box<dyn FnOnce() + Send + 'static>;

/// The parts of `window.location` the tag manager reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLocation {
    pub href: String,
    pub pathname: String,
    pub search: String,
}

impl PageLocation {
    pub fn parse(href: &str) -> GtmResult<Self> {
        let url = Url::parse(href)
            .map_err(|err| invalid_argument(format!("invalid page URL `{href}`: {err}")))?;
        Ok(Self {
            href: url.as_str().to_string(),
            pathname: url.path().to_string(),
            search: url.query().map(|q| format!("?{q}")).unwrap_or_default(),
        })
    }
}

/// Description of the `<script>` element that loads the GTM container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderScript {
    pub id: String,
    pub src: String,
    pub nonce: Option<String>,
    pub is_async: bool,
}

/// Host page access. Implementations must tolerate being called from any render.
pub trait BrowserContext: Send + Sync {
    fn location(&self) -> PageLocation;

    fn document_title(&self) -> String;

    /// Appends `entry` to the named data layer array, creating the array when absent.
    fn push_data_layer(&self, data_layer: &str, entry: Value);

    /// Calls the page's `gtag` function with `args`. When the page has none yet, a queuing shim
    /// that pushes its `arguments` onto `data_layer` is installed first.
    fn gtag(&self, data_layer: &str, args: Vec<Value>);

    fn cookies(&self) -> &dyn CookieJar;

    /// Appends the loader script to the document. `on_load` fires once the script has loaded.
    fn inject_script(&self, script: LoaderScript, on_load: ScriptLoadCallback) -> GtmResult<()>;
}

/// Returns the browser context for the current runtime, or `None` when there is no DOM
/// (native targets, server-side rendering, workers).
pub fn detect() -> Option<Arc<dyn BrowserContext>> {
    #[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
    {
        if crate::platform::environment::is_browser() {
            return Some(Arc::new(web::WebBrowser::new()) as Arc<dyn BrowserContext>);
        }
    }

    None
}
