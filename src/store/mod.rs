//! Time-series store
//!
//! Keeps a bounded history of mid prices and funding rates for every
//! (instrument, exchange) pair seen upstream. The store is the single source
//! of truth for history: the poller is its only writer and query handlers
//! only read it, both through the [`SharedStore`] handle.

mod series;

pub use series::BoundedSeries;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::feed::Sections;
use crate::types::{Exchange, FundingPoint, Instrument, PricePoint, TimestampMs};

/// Default price history: ~1h at a 1 Hz poll
pub const DEFAULT_PRICE_CAPACITY: usize = 6_000;
/// Default funding history: ~4h at a 1 Hz poll
pub const DEFAULT_FUNDING_CAPACITY: usize = 14_400;

type SeriesMap<T> = BTreeMap<Instrument, BTreeMap<Exchange, BoundedSeries<T>>>;

/// What one batch write put into the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub exchanges: usize,
    pub rows: usize,
    pub prices: usize,
    pub funding: usize,
}

/// Bounded per-key history of prices and funding rates
#[derive(Debug)]
pub struct TimeSeriesStore {
    price_capacity: usize,
    funding_capacity: usize,
    prices: SeriesMap<PricePoint>,
    funding: SeriesMap<FundingPoint>,
}

impl TimeSeriesStore {
    pub fn new(price_capacity: usize, funding_capacity: usize) -> Self {
        Self {
            price_capacity: price_capacity.max(1),
            funding_capacity: funding_capacity.max(1),
            prices: BTreeMap::new(),
            funding: BTreeMap::new(),
        }
    }

    /// Record one observation. Absent values are skipped; series are created lazily.
    pub fn append(
        &mut self,
        instrument: &str,
        exchange: &str,
        ts: TimestampMs,
        price: Option<f64>,
        funding: Option<f64>,
    ) {
        if let Some(mid) = price {
            let capacity = self.price_capacity;
            self.prices
                .entry(instrument.to_string())
                .or_default()
                .entry(exchange.to_string())
                .or_insert_with(|| BoundedSeries::new(capacity))
                .push(PricePoint::new(ts, mid));
        }

        if let Some(rate) = funding {
            let capacity = self.funding_capacity;
            self.funding
                .entry(instrument.to_string())
                .or_default()
                .entry(exchange.to_string())
                .or_insert_with(|| BoundedSeries::new(capacity))
                .push(FundingPoint::new(ts, rate));
        }
    }

    /// Write a whole normalized batch stamped with a single poll timestamp
    pub fn apply_batch(&mut self, sections: &Sections, ts: TimestampMs) -> WriteSummary {
        let mut summary = WriteSummary {
            exchanges: sections.len(),
            ..WriteSummary::default()
        };

        for (exchange, rows) in sections {
            for row in rows {
                let mid = row.mid();
                self.append(&row.instrument, exchange, ts, mid, row.funding);
                summary.rows += 1;
                summary.prices += usize::from(mid.is_some());
                summary.funding += usize::from(row.funding.is_some());
            }
        }

        summary
    }

    pub fn latest(&self, instrument: &str, exchange: &str) -> Option<PricePoint> {
        self.price_series(instrument, exchange)?.latest()
    }

    /// Last `count` price points, most recent last
    pub fn recent(&self, instrument: &str, exchange: &str, count: usize) -> Vec<PricePoint> {
        self.price_series(instrument, exchange)
            .map(|s| s.recent(count))
            .unwrap_or_default()
    }

    /// Price points at or after `cutoff`, most recent last
    pub fn recent_since(
        &self,
        instrument: &str,
        exchange: &str,
        cutoff: TimestampMs,
    ) -> Vec<PricePoint> {
        self.price_series(instrument, exchange)
            .map(|s| s.since(cutoff))
            .unwrap_or_default()
    }

    pub fn latest_funding(&self, instrument: &str, exchange: &str) -> Option<FundingPoint> {
        self.funding
            .get(instrument)?
            .get(exchange)?
            .latest()
    }

    /// Instruments with price history on two or more exchanges
    pub fn instruments_with_at_least_two_exchanges(&self) -> BTreeSet<Instrument> {
        self.prices
            .iter()
            .filter(|(_, exchanges)| exchanges.len() >= 2)
            .map(|(instrument, _)| instrument.clone())
            .collect()
    }

    /// Exchanges that have reported a price for `instrument`, with the
    /// timestamp of their most recent sample (alphabetical by exchange)
    pub fn reporting_exchanges(&self, instrument: &str) -> Vec<(Exchange, TimestampMs)> {
        self.prices
            .get(instrument)
            .map(|exchanges| {
                exchanges
                    .iter()
                    .filter_map(|(exchange, series)| {
                        series.latest().map(|p| (exchange.clone(), p.ts))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of instruments with any price history
    pub fn instrument_count(&self) -> usize {
        self.prices.len()
    }

    pub fn price_capacity(&self) -> usize {
        self.price_capacity
    }

    pub fn funding_capacity(&self) -> usize {
        self.funding_capacity
    }

    fn price_series(&self, instrument: &str, exchange: &str) -> Option<&BoundedSeries<PricePoint>> {
        self.prices.get(instrument)?.get(exchange)
    }
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_CAPACITY, DEFAULT_FUNDING_CAPACITY)
    }
}

/// Cloneable handle to the store. One lock covers every key; a write batch
/// or a full read assembly holds it for its whole duration.
#[derive(Debug, Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<TimeSeriesStore>>,
}

impl SharedStore {
    pub fn new(store: TimeSeriesStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, TimeSeriesStore> {
        self.inner.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::NormalizedRow;

    #[test]
    fn test_append_skips_absent_values() {
        let mut store = TimeSeriesStore::new(10, 20);
        store.append("BTCUSDT", "binance", 1, None, Some(0.0001));
        assert!(store.latest("BTCUSDT", "binance").is_none());
        assert_eq!(store.latest_funding("BTCUSDT", "binance").unwrap().rate, 0.0001);

        store.append("BTCUSDT", "binance", 2, Some(100.0), None);
        assert_eq!(store.latest("BTCUSDT", "binance"), Some(PricePoint::new(2, 100.0)));
        assert_eq!(store.latest_funding("BTCUSDT", "binance").unwrap().ts, 1);
    }

    #[test]
    fn test_price_and_funding_capacities_are_independent() {
        let mut store = TimeSeriesStore::new(3, 5);
        for ts in 0..10 {
            store.append("ETHUSDT", "okx", ts, Some(10.0 + ts as f64), Some(0.001));
        }
        let recent = store.recent("ETHUSDT", "okx", 100);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.iter().map(|p| p.ts).collect::<Vec<_>>(), vec![7, 8, 9]);
        assert_eq!(store.funding["ETHUSDT"]["okx"].len(), 5);
    }

    #[test]
    fn test_unknown_keys_are_absent() {
        let store = TimeSeriesStore::default();
        assert!(store.latest("X", "y").is_none());
        assert!(store.recent("X", "y", 10).is_empty());
        assert!(store.recent_since("X", "y", 0).is_empty());
        assert!(store.latest_funding("X", "y").is_none());
        assert!(store.reporting_exchanges("X").is_empty());
    }

    #[test]
    fn test_instruments_with_two_exchanges() {
        let mut store = TimeSeriesStore::new(10, 20);
        store.append("BTCUSDT", "binance", 1, Some(100.0), None);
        store.append("BTCUSDT", "okx", 1, Some(101.0), None);
        store.append("ETHUSDT", "binance", 1, Some(10.0), None);
        // Funding alone does not make an exchange a price reporter
        store.append("ETHUSDT", "okx", 1, None, Some(0.0002));

        let qualifying = store.instruments_with_at_least_two_exchanges();
        assert_eq!(qualifying.into_iter().collect::<Vec<_>>(), vec!["BTCUSDT".to_string()]);
    }

    #[test]
    fn test_reporting_exchanges_carry_latest_ts() {
        let mut store = TimeSeriesStore::new(10, 20);
        store.append("SOLUSDT", "bybit", 5, Some(20.0), None);
        store.append("SOLUSDT", "deribit", 9, Some(20.1), None);
        store.append("SOLUSDT", "bybit", 7, Some(20.2), None);

        assert_eq!(
            store.reporting_exchanges("SOLUSDT"),
            vec![("bybit".to_string(), 7), ("deribit".to_string(), 9)]
        );
    }

    #[test]
    fn test_apply_batch_summary() {
        let mut sections = Sections::new();
        sections.insert(
            "binance".to_string(),
            vec![
                NormalizedRow {
                    instrument: "BTCUSDT".to_string(),
                    bid: Some(100.0),
                    ask: Some(100.2),
                    funding: Some(0.0001),
                },
                NormalizedRow {
                    instrument: "ETHUSDT".to_string(),
                    bid: None,
                    ask: None,
                    funding: Some(-0.0002),
                },
            ],
        );

        let mut store = TimeSeriesStore::new(10, 20);
        let summary = store.apply_batch(&sections, 42);
        assert_eq!(
            summary,
            WriteSummary {
                exchanges: 1,
                rows: 2,
                prices: 1,
                funding: 2
            }
        );
        let mid = store.latest("BTCUSDT", "binance").unwrap();
        assert_eq!(mid.ts, 42);
        assert!((mid.mid - 100.1).abs() < 1e-9);
    }

    #[test]
    fn test_shared_store_handle() {
        let shared = SharedStore::new(TimeSeriesStore::new(4, 8));
        let writer = shared.clone();
        tokio_test::block_on(async {
            writer.lock().await.append("BTCUSDT", "okx", 1, Some(1.0), None);
            assert_eq!(shared.lock().await.instrument_count(), 1);
        });
    }
}
