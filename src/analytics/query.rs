//! Query service - on-demand spread report
//!
//! Reads the store under its lock, pairs exchanges per instrument, runs the
//! spread statistics and assembles the records served by `/api/data`.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::pairing::PairSelector;
use super::spread::{evaluate, Baseline};
use crate::store::{SharedStore, TimeSeriesStore};
use crate::types::{now_ms, round_to, Exchange, Instrument, TimestampMs, WindowMode};

pub const DEFAULT_WINDOW: u64 = 300;
pub const MAX_WINDOW: u64 = 86_400;

const PRICE_DIGITS: i32 = 10;
const SPREAD_DIGITS: i32 = 6;
const ZSCORE_DIGITS: i32 = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("window must be an integer between 1 and {max}, got {0:?}", max = MAX_WINDOW)]
    InvalidWindow(String),

    #[error("mode must be 'samples' or 'seconds', got {0:?}")]
    InvalidMode(String),

    #[error("failed to assemble report: {0}")]
    Internal(String),
}

/// Requested rolling window: a size plus how to interpret it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub size: u64,
    pub mode: WindowMode,
}

impl WindowSpec {
    pub fn new(size: u64, mode: WindowMode) -> Self {
        Self { size, mode }
    }

    /// Build from raw query-string values; missing values take the defaults
    pub fn parse(
        window: Option<&str>,
        mode: Option<&str>,
        default_window: u64,
    ) -> Result<Self, QueryError> {
        let size = match window.map(str::trim).filter(|w| !w.is_empty()) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|w| (1..=MAX_WINDOW).contains(w))
                .ok_or_else(|| QueryError::InvalidWindow(raw.to_string()))?,
            None => default_window,
        };

        let mode = match mode.map(str::trim).filter(|m| !m.is_empty()) {
            Some(raw) => {
                WindowMode::parse(raw).ok_or_else(|| QueryError::InvalidMode(raw.to_string()))?
            }
            None => WindowMode::default(),
        };

        Ok(Self { size, mode })
    }

    fn baseline(&self, now: TimestampMs) -> Baseline {
        match self.mode {
            WindowMode::Samples => Baseline::LastSamples(self.size as usize),
            WindowMode::Seconds => {
                Baseline::Since(now.saturating_sub((self.size as i64).saturating_mul(1000)))
            }
        }
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, WindowMode::default())
    }
}

/// One instrument's spread snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadRecord {
    #[serde(rename = "symbol")]
    pub instrument: Instrument,
    #[serde(rename = "exA")]
    pub ex_a: Exchange,
    #[serde(rename = "exB")]
    pub ex_b: Exchange,
    #[serde(rename = "midA")]
    pub mid_a: f64,
    #[serde(rename = "midB")]
    pub mid_b: f64,
    pub spread_pct: f64,
    pub avg_spread_pct: Option<f64>,
    pub zscore: Option<f64>,
    #[serde(rename = "fundingA")]
    pub funding_a: Option<f64>,
    #[serde(rename = "fundingB")]
    pub funding_b: Option<f64>,
    pub funding_avg: Option<f64>,
    pub window: u64,
    pub samples: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpreadReport {
    pub updated: String,
    pub mode: WindowMode,
    pub window: u64,
    pub items: Vec<SpreadRecord>,
}

#[derive(Debug, Clone)]
pub struct QueryService {
    store: SharedStore,
    selector: PairSelector,
}

impl QueryService {
    pub fn new(store: SharedStore, selector: PairSelector) -> Self {
        Self { store, selector }
    }

    /// Assemble the report. A panic during assembly is contained here and
    /// surfaces as [`QueryError::Internal`].
    pub async fn snapshot(&self, window: WindowSpec) -> Result<SpreadReport, QueryError> {
        let service = self.clone();
        tokio::spawn(async move { service.assemble(window).await })
            .await
            .map_err(|e| QueryError::Internal(e.to_string()))
    }

    async fn assemble(&self, window: WindowSpec) -> SpreadReport {
        let now = now_ms();
        let items = {
            let store = self.store.lock().await;
            build_records(&store, &self.selector, window, now)
        };

        tracing::debug!(items = items.len(), window = window.size, mode = %window.mode, "Spread report assembled");

        SpreadReport {
            updated: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            mode: window.mode,
            window: window.size,
            items,
        }
    }
}

/// Records for every instrument reported by two or more exchanges, ordered
/// by descending absolute current spread
pub fn build_records(
    store: &TimeSeriesStore,
    selector: &PairSelector,
    window: WindowSpec,
    now: TimestampMs,
) -> Vec<SpreadRecord> {
    let baseline = window.baseline(now);

    let mut records: Vec<SpreadRecord> = store
        .instruments_with_at_least_two_exchanges()
        .into_iter()
        .filter_map(|instrument| {
            let (ex_a, ex_b) = selector.select(&store.reporting_exchanges(&instrument))?;
            let stats = evaluate(store, &instrument, &ex_a, &ex_b, baseline)?;

            Some(SpreadRecord {
                mid_a: round_to(stats.mid_a, PRICE_DIGITS),
                mid_b: round_to(stats.mid_b, PRICE_DIGITS),
                spread_pct: round_to(stats.spread_pct, SPREAD_DIGITS),
                avg_spread_pct: stats.rolling.mean.map(|m| round_to(m, SPREAD_DIGITS)),
                zscore: stats.zscore.map(|z| round_to(z, ZSCORE_DIGITS)),
                funding_a: stats.funding_a,
                funding_b: stats.funding_b,
                funding_avg: stats.funding_avg,
                window: window.size,
                samples: stats.rolling.samples,
                instrument,
                ex_a,
                ex_b,
            })
        })
        .collect();

    records.sort_by(|a, b| b.spread_pct.abs().total_cmp(&a.spread_pct.abs()));
    records
}
