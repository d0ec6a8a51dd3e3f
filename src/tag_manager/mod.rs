#![doc = include_str!("README.md")]
mod config;
pub mod constants;
pub mod data_layer;
pub mod dedupe;
pub mod error;
mod hooks;
mod provider;
mod sink;

pub use config::{ConsentUpdateMode, GtmConfig};
pub use data_layer::{ConsentDirective, GtmEvent};
pub use dedupe::LastValueGate;
pub use error::{GtmError, GtmErrorCode, GtmResult};
pub use hooks::{use_gtm, use_gtm_context, UseGtm};
pub use provider::{BootstrapState, GtmContext, GtmProvider};
pub use sink::EventSink;
