//! Mounts a provider against the in-memory browser and prints the data layer it produced.

use std::error::Error;
use std::sync::Arc;

use gtm_consent_rs::consent::{ConsentMode, ConsentSettings, ConsentType};
use gtm_consent_rs::platform::browser::{BrowserContext, MemoryBrowser};
use gtm_consent_rs::platform::BuildMode;
use gtm_consent_rs::tag_manager::{use_gtm, GtmConfig, GtmProvider};

fn main() -> Result<(), Box<dyn Error>> {
    let browser = Arc::new(MemoryBrowser::with_location("https://shop.example/")?);
    browser.set_title("Shop");

    let config = GtmConfig::new("GTM-DEMO123")
        .with_nonce("n0nce")
        .with_default_consent(
            ConsentSettings::default().with(ConsentType::AnalyticsStorage, ConsentMode::Granted),
        );
    let provider = GtmProvider::with_build_mode(
        config,
        Some(browser.clone() as Arc<dyn BrowserContext>),
        BuildMode::Production,
    )?;

    println!("state before mount: {:?}", provider.state());
    println!("state after mount:  {:?}", provider.mount());
    browser.complete_script_loads();
    println!("state after load:   {:?}", provider.state());

    for script in browser.injected_scripts() {
        println!("injected <script id={} src={} nonce={:?}>", script.id, script.src, script.nonce);
    }
    if let Some(noscript) = provider.noscript_html()? {
        println!("{noscript}");
    }

    let gtm = use_gtm(Some(&provider.context()))?;
    gtm.push_page_view(None, None);
    gtm.track_button_click("add_to_cart", None);

    println!("dataLayer:");
    for entry in browser.data_layer("dataLayer") {
        println!("  {entry}");
    }
    Ok(())
}
