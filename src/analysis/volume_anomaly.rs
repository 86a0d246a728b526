// =============================================================================
// Volume Anomaly Detector — rolling per-coin volume baseline
// =============================================================================
//
// Each call records the current 24h volume, then:
//   - with >= 5 samples: z-score of the current volume against the rolling
//     mean (population std-dev); anomaly when z > 2.0
//   - otherwise: volume / market-cap turnover heuristic; anomaly when the
//     ratio exceeds 15%, deviation reported as ratio * 10 and the baseline
//     as 5% of market cap
//
// History is bounded to the last 50 samples per coin. The coin key space is
// not bounded. The latest classification per coin is kept so the signal
// pipeline can read it without recording another sample.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{round_dp, CoinMarket};

const MAX_HISTORY_POINTS: usize = 50;
const MIN_SAMPLES_FOR_ZSCORE: usize = 5;
const ZSCORE_THRESHOLD: f64 = 2.0;
const TURNOVER_THRESHOLD: f64 = 0.15;
const EXPECTED_TURNOVER: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnomaly {
    pub coin_id: String,
    pub current_volume: f64,
    pub baseline_volume: f64,
    pub deviation_multiple: f64,
    pub is_anomaly: bool,
}

/// An anomaly enriched with listing metadata for the scan endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    #[serde(flatten)]
    pub anomaly: VolumeAnomaly,
    pub symbol: String,
    pub name: String,
    pub price_change_24h: Option<f64>,
}

#[derive(Default)]
struct CoinHistory {
    samples: VecDeque<f64>,
    latest: Option<VolumeAnomaly>,
}

#[derive(Default)]
pub struct VolumeAnomalyDetector {
    history: RwLock<HashMap<String, CoinHistory>>,
}

impl VolumeAnomalyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `current_volume` for `coin_id` and classify it.
    pub fn detect(&self, coin_id: &str, current_volume: f64, market_cap: f64) -> VolumeAnomaly {
        let samples: Vec<f64> = {
            let mut history = self.history.write();
            let series = &mut history.entry(coin_id.to_string()).or_default().samples;
            if series.len() == MAX_HISTORY_POINTS {
                series.pop_front();
            }
            series.push_back(current_volume);
            series.iter().copied().collect()
        };

        let (deviation, baseline, is_anomaly) = if samples.len() >= MIN_SAMPLES_FOR_ZSCORE {
            let n = samples.len() as f64;
            let mean = samples.iter().sum::<f64>() / n;
            let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std_dev = variance.sqrt();
            let z = if std_dev > 0.0 {
                (current_volume - mean) / std_dev
            } else {
                0.0
            };
            (z, mean, z > ZSCORE_THRESHOLD)
        } else {
            let ratio = if market_cap > 0.0 {
                current_volume / market_cap
            } else {
                0.0
            };
            (ratio * 10.0, market_cap * EXPECTED_TURNOVER, ratio > TURNOVER_THRESHOLD)
        };

        let anomaly = VolumeAnomaly {
            coin_id: coin_id.to_string(),
            current_volume,
            baseline_volume: round_dp(baseline, 0),
            deviation_multiple: round_dp(deviation, 2),
            is_anomaly,
        };
        if let Some(coin) = self.history.write().get_mut(coin_id) {
            coin.latest = Some(anomaly.clone());
        }
        anomaly
    }

    /// Most recent classification for `coin_id`, without recording a sample.
    pub fn latest(&self, coin_id: &str) -> Option<VolumeAnomaly> {
        self.history.read().get(coin_id)?.latest.clone()
    }

    /// Run detection over a market listing and return only the anomalies,
    /// strongest first.
    pub fn scan(&self, coins: &[CoinMarket]) -> Vec<AnomalyReport> {
        let mut anomalies: Vec<AnomalyReport> = coins
            .iter()
            .filter_map(|coin| {
                let anomaly = self.detect(
                    &coin.id,
                    coin.total_volume.unwrap_or(0.0),
                    coin.market_cap.unwrap_or(1.0),
                );
                anomaly.is_anomaly.then(|| AnomalyReport {
                    anomaly,
                    symbol: coin.symbol.to_uppercase(),
                    name: coin.name.clone(),
                    price_change_24h: coin.price_change_percentage_24h_in_currency,
                })
            })
            .collect();

        anomalies.sort_by(|a, b| {
            b.anomaly
                .deviation_multiple
                .total_cmp(&a.anomaly.deviation_multiple)
        });

        debug!(scanned = coins.len(), anomalies = anomalies.len(), "volume scan complete");
        anomalies
    }

    /// Samples currently held for `coin_id`.
    #[cfg(test)]
    pub fn history_len(&self, coin_id: &str) -> usize {
        self.history.read().get(coin_id).map_or(0, |c| c.samples.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_uses_turnover_heuristic() {
        let detector = VolumeAnomalyDetector::new();
        let a = detector.detect("pepe", 200.0, 1_000.0);
        assert!(a.is_anomaly);
        assert_eq!(a.deviation_multiple, 2.0);
        assert_eq!(a.baseline_volume, 50.0);

        let b = detector.detect("bitcoin", 50.0, 1_000.0);
        assert!(!b.is_anomaly);
    }

    #[test]
    fn zero_market_cap_is_not_an_anomaly() {
        let detector = VolumeAnomalyDetector::new();
        let a = detector.detect("ghost", 1e9, 0.0);
        assert!(!a.is_anomaly);
        assert_eq!(a.deviation_multiple, 0.0);
    }

    #[test]
    fn spike_over_flat_baseline_is_flagged() {
        let detector = VolumeAnomalyDetector::new();
        for _ in 0..20 {
            assert!(!detector.detect("eth", 100.0, 1e12).is_anomaly);
        }
        let spike = detector.detect("eth", 1_000.0, 1e12);
        assert!(spike.is_anomaly);
        assert!(spike.deviation_multiple > 2.0);
    }

    #[test]
    fn constant_volume_has_zero_deviation() {
        let detector = VolumeAnomalyDetector::new();
        let mut last = None;
        for _ in 0..6 {
            last = Some(detector.detect("usdt", 10.0, 1e6));
        }
        let last = last.unwrap();
        assert_eq!(last.deviation_multiple, 0.0);
        assert_eq!(last.baseline_volume, 10.0);
    }

    #[test]
    fn history_is_bounded() {
        let detector = VolumeAnomalyDetector::new();
        for i in 0..120 {
            detector.detect("sol", i as f64, 1e6);
        }
        assert_eq!(detector.history_len("sol"), MAX_HISTORY_POINTS);
        assert_eq!(detector.history_len("unknown"), 0);
    }

    #[test]
    fn latest_reads_without_recording() {
        let detector = VolumeAnomalyDetector::new();
        assert!(detector.latest("pepe").is_none());

        detector.detect("pepe", 200.0, 1_000.0);
        let latest = detector.latest("pepe").unwrap();
        assert!(latest.is_anomaly);
        assert_eq!(detector.history_len("pepe"), 1);
    }

    #[test]
    fn scan_returns_only_anomalies_sorted() {
        let detector = VolumeAnomalyDetector::new();
        let coin = |id: &str, vol: f64| CoinMarket {
            id: id.into(),
            symbol: id.into(),
            name: id.into(),
            total_volume: Some(vol),
            market_cap: Some(1_000.0),
            ..Default::default()
        };
        let coins = vec![coin("a", 200.0), coin("b", 10.0), coin("c", 500.0)];

        let out = detector.scan(&coins);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].anomaly.coin_id, "c");
        assert_eq!(out[0].symbol, "C");
        assert_eq!(out[1].anomaly.coin_id, "a");
    }
}
