//! Exchange pair selection
//!
//! Picks the two venues whose mids are compared for an instrument: the
//! configured primary/secondary pair when both report it, otherwise the
//! two freshest reporters.

use crate::types::{Exchange, TimestampMs};

pub const DEFAULT_PRIMARY: &str = "binance";
pub const DEFAULT_SECONDARY: &str = "okx";

#[derive(Debug, Clone)]
pub struct PairSelector {
    primary: Exchange,
    secondary: Exchange,
}

impl PairSelector {
    pub fn new(primary: impl Into<Exchange>, secondary: impl Into<Exchange>) -> Self {
        Self {
            primary: primary.into().to_lowercase(),
            secondary: secondary.into().to_lowercase(),
        }
    }

    /// Choose `(exA, exB)` from the exchanges reporting an instrument.
    ///
    /// `reporting` holds each exchange with the timestamp of its latest
    /// sample. Ties in recency keep the input order.
    pub fn select(&self, reporting: &[(Exchange, TimestampMs)]) -> Option<(Exchange, Exchange)> {
        if reporting.len() < 2 {
            return None;
        }

        let has = |name: &str| reporting.iter().any(|(ex, _)| ex == name);
        if has(&self.primary) && has(&self.secondary) {
            return Some((self.primary.clone(), self.secondary.clone()));
        }

        let mut ranked: Vec<&(Exchange, TimestampMs)> = reporting.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        Some((ranked[0].0.clone(), ranked[1].0.clone()))
    }
}

impl Default for PairSelector {
    fn default() -> Self {
        Self::new(DEFAULT_PRIMARY, DEFAULT_SECONDARY)
    }
}
