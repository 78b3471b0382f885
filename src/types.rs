//! Core types used throughout the monitor
//!
//! Defines the timestamped samples held by the store and the helpers for
//! turning wall-clock time into sample timestamps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument identifier as reported upstream (e.g. "BTCUSDT")
pub type Instrument = String;

/// Normalized, lower-cased exchange identifier (e.g. "binance")
pub type Exchange = String;

/// UTC epoch milliseconds
pub type TimestampMs = i64;

/// Current UTC time in epoch milliseconds
pub fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}

/// Anything stored in a bounded series carries a timestamp
pub trait Timestamped {
    fn ts(&self) -> TimestampMs;
}

/// Mid price observed on one exchange at one poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts: TimestampMs,
    pub mid: f64,
}

impl PricePoint {
    pub fn new(ts: TimestampMs, mid: f64) -> Self {
        Self { ts, mid }
    }
}

impl Timestamped for PricePoint {
    fn ts(&self) -> TimestampMs {
        self.ts
    }
}

/// Funding rate (signed fraction) observed on one exchange at one poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundingPoint {
    pub ts: TimestampMs,
    pub rate: f64,
}

impl FundingPoint {
    pub fn new(ts: TimestampMs, rate: f64) -> Self {
        Self { ts, rate }
    }
}

impl Timestamped for FundingPoint {
    fn ts(&self) -> TimestampMs {
        self.ts
    }
}

/// How the rolling baseline window is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Last N samples per side (approximates N seconds at a 1 Hz poll)
    Samples,
    /// Samples whose timestamp falls within the last N seconds
    Seconds,
}

impl Default for WindowMode {
    fn default() -> Self {
        WindowMode::Samples
    }
}

impl WindowMode {
    /// Parse from a query-string value
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "samples" | "count" => Some(WindowMode::Samples),
            "seconds" | "time" | "elapsed" => Some(WindowMode::Seconds),
            _ => None,
        }
    }
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowMode::Samples => write!(f, "samples"),
            WindowMode::Seconds => write!(f, "seconds"),
        }
    }
}

/// Round to a fixed number of decimal digits
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
