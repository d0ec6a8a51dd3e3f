#![doc = include_str!("RUSTDOC.md")]

pub mod components;
pub mod consent;
pub mod platform;
pub mod tag_manager;
pub mod util;

#[cfg(test)]
pub mod test_support;
