//! Dashboard API Types
//!
//! DTOs for HTTP communication with the browser frontend.

use serde::{Deserialize, Serialize};

use crate::feed::FeedHealth;

/// Envelope shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Query string for `/api/data`. Kept as raw strings so malformed values
/// reach the handler and get a structured error instead of an extractor
/// rejection.
#[derive(Debug, Default, Deserialize)]
pub struct DataQuery {
    pub window: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub feed: FeedHealth,
    pub instruments: usize,
    pub price_capacity: usize,
    pub funding_capacity: usize,
    pub timestamp: i64,
}
