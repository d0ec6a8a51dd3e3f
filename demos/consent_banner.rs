//! Renders the consent banner, answers it, then "reloads" the page to show the decision sticks.

use std::error::Error;
use std::sync::Arc;

use gtm_consent_rs::components::{
    BannerAction, BannerPosition, CookieConsentBanner, CookieConsentProps,
};
use gtm_consent_rs::consent::constants::COOKIE_NAME;
use gtm_consent_rs::consent::use_cookie_consent;
use gtm_consent_rs::platform::browser::{BrowserContext, CookieJar, MemoryBrowser};
use gtm_consent_rs::platform::BuildMode;
use gtm_consent_rs::tag_manager::{GtmConfig, GtmProvider};

fn provider_for(browser: &Arc<MemoryBrowser>) -> Result<GtmProvider, Box<dyn Error>> {
    let provider = GtmProvider::with_build_mode(
        GtmConfig::new("GTM-DEMO123"),
        Some(browser.clone() as Arc<dyn BrowserContext>),
        BuildMode::Production,
    )?;
    provider.mount();
    Ok(provider)
}

fn main() -> Result<(), Box<dyn Error>> {
    let browser = Arc::new(MemoryBrowser::new());
    let provider = provider_for(&browser)?;

    let props = CookieConsentProps {
        position: BannerPosition::Top,
        ..CookieConsentProps::default()
    };
    let mut banner = CookieConsentBanner::new(props, Some(&provider.context()))?;
    println!("{}", banner.render().unwrap_or_default());

    // Buttons report their action through `data-consent-action`.
    let clicked: BannerAction = "reject-all".parse()?;
    banner.dispatch(clicked)?;
    println!("after {clicked}: visible = {}", banner.is_visible());

    let cookie = browser.cookie_jar().get(COOKIE_NAME).unwrap_or_default();
    println!("{COOKIE_NAME} = {cookie}");

    let reloaded = Arc::new(MemoryBrowser::new());
    reloaded.cookie_jar().insert_raw(COOKIE_NAME, cookie);
    let provider = provider_for(&reloaded)?;
    let store = use_cookie_consent(Some(&provider.context()))?;
    println!("restored status: {}", store.status());
    println!("replayed gtag calls: {:?}", reloaded.gtag_calls());
    Ok(())
}
