//! Upstream source implementations (Pulse aggregator)

mod pulse;

pub use pulse::{PulseClient, DEFAULT_UPSTREAM_URL};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Transient failure of one poll. Never fatal: the next cycle retries.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Trait for upstream document sources
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Fetch one raw document
    async fn fetch(&self) -> Result<Value, FetchError>;
}
