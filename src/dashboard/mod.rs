//! Dashboard Module
//!
//! HTTP API for monitoring cross-exchange spreads from a browser.
//! Only compiled when the `dashboard` feature is enabled.

mod api;
mod types;

pub use api::create_router;
pub use types::*;

use std::sync::Arc;

use crate::analytics::QueryService;
use crate::feed::FeedMonitor;
use crate::store::SharedStore;

/// Shared handler state; cheap to clone
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub query: QueryService,
    pub store: SharedStore,
    pub monitor: Arc<FeedMonitor>,
    pub default_window: u64,
}
