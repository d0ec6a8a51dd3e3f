/// Default name of the data layer array on the host page.
pub const DEFAULT_DATA_LAYER_NAME: &str = "dataLayer";

pub const GTM_SCRIPT_URL: &str = "https://www.googletagmanager.com/gtm.js";
pub const GTM_NOSCRIPT_URL: &str = "https://www.googletagmanager.com/ns.html";

/// DOM id given to the injected loader script.
pub const GTM_SCRIPT_ELEMENT_ID: &str = "gtm-script";

/// Event names understood by common GTM container setups.
pub mod events {
    pub const PAGE_VIEW: &str = "page_view";
    pub const VIRTUAL_PAGE_VIEW: &str = "virtual_page_view";

    pub const BUTTON_CLICK: &str = "button_click";
    pub const LINK_CLICK: &str = "link_click";
    pub const SCROLL_DEPTH: &str = "scroll_depth";

    pub const FORM_START: &str = "form_start";
    pub const FORM_SUBMIT: &str = "form_submit";
    pub const FORM_ERROR: &str = "form_error";

    pub const FILE_DOWNLOAD: &str = "file_download";
    pub const VIDEO_PLAY: &str = "video_play";
    pub const VIDEO_PAUSE: &str = "video_pause";
    pub const VIDEO_COMPLETE: &str = "video_complete";

    pub const VIEW_ITEM: &str = "view_item";
    pub const ADD_TO_CART: &str = "add_to_cart";
    pub const PURCHASE: &str = "purchase";

    pub const CONSENT_UPDATE: &str = "consent_update";
    pub const CONSENT_DEFAULT: &str = "consent_default";

    /// Emitted by the loader bootstrap together with `gtm.start`.
    pub const GTM_JS: &str = "gtm.js";
}
