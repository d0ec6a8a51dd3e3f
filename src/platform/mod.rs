pub mod browser;
pub mod environment;

pub use browser::{BrowserContext, LoaderScript, PageLocation};
pub use environment::{build_mode, is_browser, BuildMode};
