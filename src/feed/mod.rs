//! Feed module - upstream ingestion
//!
//! Polls the Pulse aggregator, normalizes its drifting document into
//! per-exchange rows and writes them into the time-series store.

pub mod normalizer;
mod poller;
pub mod sources;

pub use normalizer::{mid_from_bid_ask, mid_price, parse_sections};
pub use poller::{FeedHealth, FeedMonitor, Fetcher, PollObserver};

use std::collections::BTreeMap;

use crate::types::{Exchange, Instrument};

/// One instrument row from one exchange section
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub instrument: Instrument,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub funding: Option<f64>,
}

impl NormalizedRow {
    /// Mid price, when the quote is usable
    pub fn mid(&self) -> Option<f64> {
        mid_price(self.bid?, self.ask?)
    }
}

/// Normalized upstream document: exchange -> rows
pub type Sections = BTreeMap<Exchange, Vec<NormalizedRow>>;
