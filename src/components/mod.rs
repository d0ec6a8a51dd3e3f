//! Drop-in UI pieces: the consent banner and route-change page view tracking.
mod banner;
mod route;

pub use banner::{BannerAction, BannerPosition, CookieConsentBanner, CookieConsentProps};
pub use route::{RouteChangeListener, RouteChangeListenerWithParams};
