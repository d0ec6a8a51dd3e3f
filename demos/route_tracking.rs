//! Simulates single-page navigation and prints the page views each listener emits.

use std::error::Error;
use std::sync::Arc;

use gtm_consent_rs::components::{RouteChangeListener, RouteChangeListenerWithParams};
use gtm_consent_rs::platform::browser::{BrowserContext, MemoryBrowser};
use gtm_consent_rs::platform::BuildMode;
use gtm_consent_rs::tag_manager::{GtmConfig, GtmProvider};

fn main() -> Result<(), Box<dyn Error>> {
    let browser = Arc::new(MemoryBrowser::with_location("https://docs.example/")?);
    let provider = GtmProvider::with_build_mode(
        GtmConfig::new("GTM-DEMO123"),
        Some(browser.clone() as Arc<dyn BrowserContext>),
        BuildMode::Production,
    )?;
    provider.mount();
    let context = provider.context();

    let mut by_path = RouteChangeListener::new(Some(&context))?;
    let mut by_url = RouteChangeListenerWithParams::new(Some(&context))?;

    for href in [
        "https://docs.example/",
        "https://docs.example/guide",
        "https://docs.example/guide?section=consent",
        "https://docs.example/guide?section=consent",
        "https://docs.example/api",
    ] {
        browser.navigate(href)?;
        let location = browser.location();
        let path_view = by_path.observe_location(&location);
        let url_view = by_url.observe_location(&location);
        println!("{href:<45} pathname listener: {path_view:<5} url listener: {url_view}");
    }

    let views = browser
        .data_layer("dataLayer")
        .into_iter()
        .filter(|entry| entry["event"] == "page_view")
        .count();
    println!("page views pushed: {views}");
    Ok(())
}
