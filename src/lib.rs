//! Pulse Spread Monitor Library
//!
//! Cross-exchange perpetual spread and funding monitoring fed by the Pulse
//! aggregator

pub mod analytics;
pub mod config;
pub mod feed;
pub mod store;
pub mod types;

#[cfg(feature = "dashboard")]
pub mod dashboard;
