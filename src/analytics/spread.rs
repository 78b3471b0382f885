//! Cross-exchange spread statistics
//!
//! Current spread between two venues, a rolling baseline of historical
//! spreads, the z-score of the current spread against it, and the funding
//! comparison.
//!
//! The historical spreads pair the two sides by rank (i-th most recent with
//! i-th most recent), not by matching timestamps. With one writer stamping
//! both sides at the same poll this lines up as long as both venues report
//! on every cycle.

use serde::Serialize;

use crate::store::TimeSeriesStore;
use crate::types::{PricePoint, TimestampMs};

/// Below this the baseline is treated as flat and no z-score is produced
pub const ZSCORE_MIN_STD: f64 = 1e-9;

/// Which history feeds the rolling baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    /// Last N samples per side
    LastSamples(usize),
    /// Samples stamped at or after the cutoff
    Since(TimestampMs),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RollingStats {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadStats {
    pub mid_a: f64,
    pub mid_b: f64,
    pub spread_pct: f64,
    pub rolling: RollingStats,
    pub zscore: Option<f64>,
    pub funding_a: Option<f64>,
    pub funding_b: Option<f64>,
    pub funding_avg: Option<f64>,
}

/// `(midB - midA) / avg * 100`, both mids positive
pub fn spread_pct(mid_a: f64, mid_b: f64) -> Option<f64> {
    if !(mid_a > 0.0 && mid_b > 0.0) {
        return None;
    }
    let avg = (mid_a + mid_b) / 2.0;
    if !(avg > 0.0) {
        return None;
    }
    let spread = (mid_b - mid_a) / avg * 100.0;
    spread.is_finite().then_some(spread)
}

/// Historical spreads from two most-recent-last series, paired by rank.
/// Output is most recent first; length is at most `min(a.len(), b.len())`.
pub fn rank_paired_spreads(a: &[PricePoint], b: &[PricePoint]) -> Vec<f64> {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .filter_map(|(pa, pb)| spread_pct(pa.mid, pb.mid))
        .collect()
}

/// Sample mean and Bessel-corrected standard deviation
pub fn rolling_stats(samples: &[f64]) -> RollingStats {
    let n = samples.len();
    match n {
        0 => RollingStats::default(),
        1 => RollingStats {
            mean: Some(samples[0]),
            std: Some(0.0),
            samples: 1,
        },
        _ => {
            let mean = samples.iter().sum::<f64>() / n as f64;
            let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            RollingStats {
                mean: Some(mean),
                std: Some(var.sqrt()),
                samples: n,
            }
        }
    }
}

pub fn zscore(current: f64, stats: &RollingStats) -> Option<f64> {
    let mean = stats.mean?;
    let std = stats.std?;
    if std > ZSCORE_MIN_STD {
        Some((current - mean) / std)
    } else {
        None
    }
}

/// Average of whichever sides have a funding rate
pub fn funding_average(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

/// Full statistics for one instrument on `(ex_a, ex_b)`.
///
/// `None` when the current spread cannot be computed; such instruments are
/// left out of query output entirely.
pub fn evaluate(
    store: &TimeSeriesStore,
    instrument: &str,
    ex_a: &str,
    ex_b: &str,
    baseline: Baseline,
) -> Option<SpreadStats> {
    let mid_a = store.latest(instrument, ex_a)?.mid;
    let mid_b = store.latest(instrument, ex_b)?.mid;
    let spread = spread_pct(mid_a, mid_b)?;

    let (series_a, series_b) = match baseline {
        Baseline::LastSamples(count) => (
            store.recent(instrument, ex_a, count),
            store.recent(instrument, ex_b, count),
        ),
        Baseline::Since(cutoff) => (
            store.recent_since(instrument, ex_a, cutoff),
            store.recent_since(instrument, ex_b, cutoff),
        ),
    };
    let rolling = rolling_stats(&rank_paired_spreads(&series_a, &series_b));

    let funding_a = store.latest_funding(instrument, ex_a).map(|f| f.rate);
    let funding_b = store.latest_funding(instrument, ex_b).map(|f| f.rate);

    Some(SpreadStats {
        mid_a,
        mid_b,
        spread_pct: spread,
        zscore: zscore(spread, &rolling),
        rolling,
        funding_a,
        funding_b,
        funding_avg: funding_average(funding_a, funding_b),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(mids: &[f64]) -> Vec<PricePoint> {
        mids.iter()
            .enumerate()
            .map(|(i, m)| PricePoint::new(i as i64, *m))
            .collect()
    }

    #[test]
    fn test_spread_pct() {
        let spread = spread_pct(100.0, 101.0).unwrap();
        assert!((spread - 0.995_024_875_6).abs() < 1e-9);
        assert!(spread_pct(101.0, 100.0).unwrap() < 0.0);
        assert_eq!(spread_pct(0.0, 100.0), None);
        assert_eq!(spread_pct(100.0, -1.0), None);
        assert_eq!(spread_pct(f64::NAN, 1.0), None);
    }

    #[test]
    fn test_rolling_stats_and_zscore() {
        let stats = rolling_stats(&[1.0, 2.0, 3.0]);
        assert_eq!(stats.mean, Some(2.0));
        assert_eq!(stats.std, Some(1.0));
        assert_eq!(stats.samples, 3);
        assert_eq!(zscore(4.0, &stats), Some(2.0));
    }

    #[test]
    fn test_rolling_stats_small_samples() {
        let empty = rolling_stats(&[]);
        assert_eq!(empty, RollingStats::default());
        assert_eq!(zscore(1.0, &empty), None);

        let single = rolling_stats(&[0.7]);
        assert_eq!(single.mean, Some(0.7));
        assert_eq!(single.std, Some(0.0));
        assert_eq!(zscore(1.0, &single), None);
    }

    #[test]
    fn test_flat_baseline_has_no_zscore() {
        let stats = rolling_stats(&[0.5; 20]);
        assert!(stats.std.unwrap() <= ZSCORE_MIN_STD);
        assert_eq!(zscore(0.5, &stats), None);
    }

    #[test]
    fn test_rank_pairing_uses_shorter_side() {
        let a = points(&[100.0, 100.0, 100.0, 100.0]);
        let b = points(&[102.0, 101.0]);
        let spreads = rank_paired_spreads(&a, &b);
        assert_eq!(spreads.len(), 2);
        // most recent first: 100 vs 101, then 100 vs 102
        assert!((spreads[0] - spread_pct(100.0, 101.0).unwrap()).abs() < 1e-12);
        assert!((spreads[1] - spread_pct(100.0, 102.0).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_funding_average() {
        let avg = funding_average(Some(0.0001), Some(-0.0003)).unwrap();
        assert!((avg + 0.0001).abs() < 1e-15);
        assert_eq!(funding_average(None, Some(0.0002)), Some(0.0002));
        assert_eq!(funding_average(Some(0.0002), None), Some(0.0002));
        assert_eq!(funding_average(None, None), None);
    }

    #[test]
    fn test_evaluate_with_both_baselines() {
        let mut store = TimeSeriesStore::new(100, 200);
        for ts in 0..10 {
            let drift = ts as f64 * 0.1;
            store.append("BTCUSDT", "binance", ts * 1000, Some(100.0), Some(0.0001));
            store.append("BTCUSDT", "okx", ts * 1000, Some(100.0 + drift), None);
        }

        let all = evaluate(&store, "BTCUSDT", "binance", "okx", Baseline::LastSamples(300)).unwrap();
        assert_eq!(all.rolling.samples, 10);
        assert!(all.zscore.unwrap() > 0.0);
        assert_eq!(all.funding_a, Some(0.0001));
        assert_eq!(all.funding_b, None);
        assert_eq!(all.funding_avg, Some(0.0001));

        let last3 = evaluate(&store, "BTCUSDT", "binance", "okx", Baseline::LastSamples(3)).unwrap();
        assert_eq!(last3.rolling.samples, 3);

        let recent = evaluate(&store, "BTCUSDT", "binance", "okx", Baseline::Since(6_000)).unwrap();
        assert_eq!(recent.rolling.samples, 4);
        assert_eq!(recent.spread_pct, all.spread_pct);
    }

    #[test]
    fn test_evaluate_requires_both_sides() {
        let mut store = TimeSeriesStore::new(10, 20);
        store.append("ETHUSDT", "binance", 1, Some(10.0), None);
        assert!(evaluate(&store, "ETHUSDT", "binance", "okx", Baseline::LastSamples(10)).is_none());
    }
}
