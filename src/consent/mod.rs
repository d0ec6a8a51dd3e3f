#![doc = include_str!("README.md")]
pub mod constants;
mod record;
mod store;
mod types;

pub use record::ConsentRecord;
pub use store::{use_cookie_consent, ConsentSnapshot, ConsentStore, ConsentStoreOptions};
pub use types::{ConsentMode, ConsentSettings, ConsentStatus, ConsentType, PartialConsent};
