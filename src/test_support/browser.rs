use std::sync::Arc;

use crate::platform::browser::{BrowserContext, MemoryBrowser};
use crate::platform::BuildMode;
use crate::tag_manager::{GtmConfig, GtmProvider};

/// A production-mode provider over a fresh in-memory browser. Not yet mounted.
pub fn production_provider(config: GtmConfig) -> (Arc<MemoryBrowser>, GtmProvider) {
    let browser = Arc::new(MemoryBrowser::new());
    let provider = GtmProvider::with_build_mode(
        config,
        Some(browser.clone() as Arc<dyn BrowserContext>),
        BuildMode::Production,
    )
    .unwrap();
    (browser, provider)
}

/// Like [`production_provider`], mounted.
pub fn mounted_provider(gtm_id: &str) -> (Arc<MemoryBrowser>, GtmProvider) {
    let (browser, provider) = production_provider(GtmConfig::new(gtm_id));
    provider.mount();
    (browser, provider)
}
