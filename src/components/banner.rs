use std::fmt;
use std::str::FromStr;

use crate::consent::{use_cookie_consent, ConsentStore};
use crate::tag_manager::error::{invalid_argument, GtmError};
use crate::tag_manager::{GtmContext, GtmResult};
use crate::util::escape_html;

/// Where the banner is pinned on the page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BannerPosition {
    Top,
    #[default]
    Bottom,
    Center,
}

impl BannerPosition {
    pub fn css_classes(&self) -> &'static str {
        match self {
            BannerPosition::Top => "fixed top-0 left-0 right-0",
            BannerPosition::Bottom => "fixed bottom-0 left-0 right-0",
            BannerPosition::Center => {
                "fixed top-1/2 left-1/2 transform -translate-x-1/2 -translate-y-1/2"
            }
        }
    }
}

impl FromStr for BannerPosition {
    type Err = GtmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "top" => Ok(BannerPosition::Top),
            "bottom" => Ok(BannerPosition::Bottom),
            "center" => Ok(BannerPosition::Center),
            other => Err(invalid_argument(format!("unknown banner position `{other}`"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieConsentProps {
    pub title: String,
    pub description: String,
    pub accept_label: String,
    pub reject_label: String,
    pub customize_label: String,
    /// Link appended to the description. Empty hides it.
    pub privacy_policy_url: String,
    pub class_name: String,
    pub position: BannerPosition,
}

impl Default for CookieConsentProps {
    fn default() -> Self {
        Self {
            title: "Cookie Settings".to_string(),
            description: "We use cookies to improve your experience on our website.".to_string(),
            accept_label: "Accept All".to_string(),
            reject_label: "Reject All".to_string(),
            customize_label: "Customize".to_string(),
            privacy_policy_url: "/privacy-policy".to_string(),
            class_name: String::new(),
            position: BannerPosition::default(),
        }
    }
}

/// A click on one of the banner's buttons. Rendered buttons carry it in `data-consent-action`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BannerAction {
    AcceptAll,
    RejectAll,
    ToggleCustomize,
}

impl BannerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BannerAction::AcceptAll => "accept-all",
            BannerAction::RejectAll => "reject-all",
            BannerAction::ToggleCustomize => "customize",
        }
    }
}

impl fmt::Display for BannerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BannerAction {
    type Err = GtmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "accept-all" => Ok(BannerAction::AcceptAll),
            "reject-all" => Ok(BannerAction::RejectAll),
            "customize" => Ok(BannerAction::ToggleCustomize),
            other => Err(invalid_argument(format!("unknown banner action `{other}`"))),
        }
    }
}

/// Consent prompt shown until the visitor makes a decision.
#[derive(Debug)]
pub struct CookieConsentBanner {
    props: CookieConsentProps,
    store: ConsentStore,
    show_customize: bool,
}

impl CookieConsentBanner {
    pub fn new(props: CookieConsentProps, context: Option<&GtmContext>) -> GtmResult<Self> {
        Ok(Self::from_store(props, use_cookie_consent(context)?))
    }

    pub fn from_store(props: CookieConsentProps, store: ConsentStore) -> Self {
        Self {
            props,
            store,
            show_customize: false,
        }
    }

    pub fn props(&self) -> &CookieConsentProps {
        &self.props
    }

    pub fn store(&self) -> &ConsentStore {
        &self.store
    }

    pub fn is_visible(&self) -> bool {
        !self.store.is_consent_given()
    }

    pub fn is_customizing(&self) -> bool {
        self.show_customize
    }

    pub fn dispatch(&mut self, action: BannerAction) -> GtmResult<()> {
        match action {
            BannerAction::AcceptAll => self.store.accept_all(),
            BannerAction::RejectAll => self.store.reject_all(),
            BannerAction::ToggleCustomize => {
                self.show_customize = !self.show_customize;
                Ok(())
            }
        }
    }

    /// Banner markup, or `None` once consent has been given.
    pub fn render(&self) -> Option<String> {
        if !self.is_visible() {
            return None;
        }
        let props = &self.props;
        let mut html = String::new();

        let mut outer = format!("{} z-50 p-4", props.position.css_classes());
        if !props.class_name.is_empty() {
            outer.push(' ');
            outer.push_str(&props.class_name);
        }
        html.push_str(&format!("<div class=\"{}\">", escape_html(&outer)));
        html.push_str(
            "<div class=\"bg-white rounded-lg shadow-lg p-6 max-w-4xl mx-auto border border-gray-200\">",
        );
        html.push_str(
            "<div class=\"flex flex-col md:flex-row md:items-center md:justify-between gap-4\">",
        );

        html.push_str("<div class=\"flex-1\">");
        html.push_str(&format!(
            "<h3 class=\"text-lg font-semibold mb-2\">{}</h3>",
            escape_html(&props.title)
        ));
        html.push_str(&format!(
            "<p class=\"text-sm text-gray-600\">{} ",
            escape_html(&props.description)
        ));
        if !props.privacy_policy_url.is_empty() {
            html.push_str(&format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" \
                 class=\"text-blue-600 hover:underline\">Privacy Policy</a>",
                escape_html(&props.privacy_policy_url)
            ));
        }
        html.push_str("</p></div>");

        html.push_str("<div class=\"flex gap-2\">");
        let secondary =
            "px-4 py-2 text-sm border border-gray-300 rounded hover:bg-gray-50 transition-colors";
        html.push_str(&button(BannerAction::RejectAll, secondary, &props.reject_label));
        html.push_str(&button(BannerAction::ToggleCustomize, secondary, &props.customize_label));
        html.push_str(&button(
            BannerAction::AcceptAll,
            "px-4 py-2 text-sm bg-blue-600 text-white rounded hover:bg-blue-700 transition-colors",
            &props.accept_label,
        ));
        html.push_str("</div></div>");

        // Category toggles are not implemented yet; the panel only acknowledges the click.
        if self.show_customize {
            html.push_str(
                "<div class=\"mt-4 pt-4 border-t border-gray-200\">\
                 <p class=\"text-sm text-gray-500\">Customize panel will be implemented in next version</p>\
                 </div>",
            );
        }

        html.push_str("</div></div>");
        Some(html)
    }
}

fn button(action: BannerAction, class: &str, label: &str) -> String {
    format!(
        "<button type=\"button\" data-consent-action=\"{action}\" class=\"{class}\">{}</button>",
        escape_html(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::consent::{ConsentStatus, ConsentStoreOptions};
    use crate::platform::browser::{BrowserContext, MemoryBrowser};
    use crate::tag_manager::EventSink;

    fn banner(props: CookieConsentProps) -> (Arc<MemoryBrowser>, CookieConsentBanner) {
        let browser = Arc::new(MemoryBrowser::new());
        let sink = EventSink::new(Some(browser.clone() as Arc<dyn BrowserContext>));
        let store = ConsentStore::new(ConsentStoreOptions::default(), sink);
        (browser, CookieConsentBanner::from_store(props, store))
    }

    #[test]
    fn renders_default_copy_while_pending() {
        let (_, banner) = banner(CookieConsentProps::default());
        let html = banner.render().unwrap();
        assert!(html.starts_with("<div class=\"fixed bottom-0 left-0 right-0 z-50 p-4\">"));
        assert!(html.contains(">Cookie Settings</h3>"));
        assert!(html.contains("We use cookies to improve your experience on our website."));
        assert!(html.contains("href=\"/privacy-policy\""));
        assert!(html.contains("data-consent-action=\"accept-all\""));
        assert!(html.contains(">Reject All</button>"));
        assert!(!html.contains("Customize panel"));
    }

    #[test]
    fn accepting_hides_the_banner() {
        let (browser, mut banner) = banner(CookieConsentProps::default());
        banner.dispatch(BannerAction::AcceptAll).unwrap();
        assert_eq!(banner.store().status(), ConsentStatus::Accepted);
        assert!(!banner.is_visible());
        assert!(banner.render().is_none());
        assert_eq!(browser.gtag_calls().len(), 1);
    }

    #[test]
    fn rejecting_hides_the_banner() {
        let (_, mut banner) = banner(CookieConsentProps::default());
        banner.dispatch(BannerAction::RejectAll).unwrap();
        assert_eq!(banner.store().status(), ConsentStatus::Rejected);
        assert!(banner.render().is_none());
    }

    #[test]
    fn customize_toggles_the_stub_panel_without_persisting() {
        let (browser, mut banner) = banner(CookieConsentProps::default());
        banner.dispatch(BannerAction::ToggleCustomize).unwrap();
        assert!(banner.is_customizing());
        assert!(banner.render().unwrap().contains("Customize panel will be implemented"));
        banner.dispatch(BannerAction::ToggleCustomize).unwrap();
        assert!(!banner.is_customizing());
        assert!(banner.is_visible());
        assert!(browser.gtag_calls().is_empty());
    }

    #[test]
    fn text_is_escaped_and_position_applied() {
        let props = CookieConsentProps {
            title: "<script>alert(1)</script>".into(),
            privacy_policy_url: String::new(),
            class_name: "my-banner".into(),
            position: BannerPosition::Center,
            ..CookieConsentProps::default()
        };
        let (_, banner) = banner(props);
        let html = banner.render().unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("Privacy Policy"));
        assert!(html.contains("-translate-y-1/2 z-50 p-4 my-banner"));
    }

    #[test]
    fn actions_parse_from_data_attributes() {
        for action in [
            BannerAction::AcceptAll,
            BannerAction::RejectAll,
            BannerAction::ToggleCustomize,
        ] {
            assert_eq!(action.as_str().parse::<BannerAction>().unwrap(), action);
        }
        assert!("dismiss".parse::<BannerAction>().is_err());
        assert_eq!("top".parse::<BannerPosition>().unwrap(), BannerPosition::Top);
    }

    #[test]
    fn banner_requires_a_provider() {
        let err = CookieConsentBanner::new(CookieConsentProps::default(), None).unwrap_err();
        assert_eq!(err.code_str(), "gtm/missing-provider");
    }
}
