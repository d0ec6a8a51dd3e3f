#![cfg(all(target_arch = "wasm32", feature = "wasm-web"))]

use gtm_consent_rs::consent::constants::COOKIE_NAME;
use gtm_consent_rs::consent::{use_cookie_consent, ConsentStatus};
use gtm_consent_rs::platform::browser::{self, BrowserContext};
use gtm_consent_rs::platform::BuildMode;
use gtm_consent_rs::tag_manager::{BootstrapState, GtmConfig, GtmProvider};
use serde_json::Map;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn page_provider(data_layer: &str) -> (std::sync::Arc<dyn BrowserContext>, GtmProvider) {
    let browser = browser::detect().expect("running in a browser");
    let config = GtmConfig::new("GTM-WASMTEST").with_data_layer_name(data_layer);
    let provider =
        GtmProvider::with_build_mode(config, Some(browser.clone()), BuildMode::Production)
            .expect("create provider");
    (browser, provider)
}

#[wasm_bindgen_test]
fn browser_is_detected() {
    let browser = browser::detect().expect("running in a browser");
    assert!(browser.location().href.starts_with("http"));
}

#[wasm_bindgen_test]
fn mount_injects_loader_after_consent_defaults() {
    let (_, provider) = page_provider("wasmSmokeLayer");
    let state = provider.mount();
    assert!(matches!(
        state,
        BootstrapState::ScriptLoading | BootstrapState::Loaded
    ));

    let document = web_sys::window().unwrap().document().unwrap();
    let script = document.get_element_by_id("gtm-script").expect("loader script");
    let src = script.get_attribute("src").unwrap();
    // The first provider mounted in this page owns the element.
    assert!(src.contains("id=GTM-WASMTEST"));
}

#[wasm_bindgen_test]
fn consent_round_trips_through_document_cookie() {
    let (browser, provider) = page_provider("wasmConsentLayer");
    provider.mount();
    let store = use_cookie_consent(Some(&provider.context())).expect("store");
    store.accept_all().expect("accept all");
    assert!(browser.cookies().get(COOKIE_NAME).is_some());

    let reloaded = use_cookie_consent(Some(&provider.context())).expect("store");
    assert_eq!(reloaded.status(), ConsentStatus::Accepted);

    reloaded.clear().expect("clear");
    assert!(browser.cookies().get(COOKIE_NAME).is_none());
}

#[wasm_bindgen_test]
fn events_reach_the_page_data_layer() {
    let (_, provider) = page_provider("wasmEventLayer");
    provider.mount();
    provider.context().push_event("video_play", Map::new());

    let window = web_sys::window().unwrap();
    let layer = js_sys::Reflect::get(&window, &"wasmEventLayer".into()).unwrap();
    let layer = js_sys::Array::from(&layer);
    assert!(layer.length() >= 3);
}
