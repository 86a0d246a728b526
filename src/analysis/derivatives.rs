// =============================================================================
// Derivatives Analysis — human-readable funding and positioning bias
// =============================================================================
//
// Same contrarian buckets as the derivatives scorer, but reported as a
// five-state bias with a description instead of a number:
//
//   funding  >0.1%  bearish          >0.05% slightly_bearish
//            <-0.1% bullish          <-0.05% slightly_bullish
//   L/S      >2.0   bearish          >1.5   slightly_bearish
//            <0.5   bullish          <0.7   slightly_bullish

use serde::{Deserialize, Serialize};

use crate::types::{round_dp, Bias, DerivativesSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAnalysis {
    pub signal: Bias,
    pub description: String,
    /// Funding in percent (4dp) or the raw ratio (2dp).
    pub value: Option<f64>,
}

impl MetricAnalysis {
    fn no_data() -> Self {
        Self {
            signal: Bias::Neutral,
            description: "No data".to_string(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativesSummary {
    pub coin_id: String,
    pub symbol: String,
    pub funding_rate: MetricAnalysis,
    pub long_short_ratio: MetricAnalysis,
    pub open_interest: Option<f64>,
}

pub fn analyze_funding_rate(rate: Option<f64>) -> MetricAnalysis {
    let Some(rate) = rate else {
        return MetricAnalysis::no_data();
    };

    let pct = rate * 100.0;
    let (signal, description) = if rate > 0.001 {
        (Bias::Bearish, format!("High positive funding ({pct:.4}%) - overcrowded longs"))
    } else if rate > 0.0005 {
        (Bias::SlightlyBearish, format!("Elevated funding ({pct:.4}%) - more longs"))
    } else if rate < -0.001 {
        (Bias::Bullish, format!("Negative funding ({pct:.4}%) - overcrowded shorts"))
    } else if rate < -0.0005 {
        (Bias::SlightlyBullish, format!("Slightly negative funding ({pct:.4}%)"))
    } else {
        (Bias::Neutral, format!("Normal funding ({pct:.4}%)"))
    };

    MetricAnalysis {
        signal,
        description,
        value: Some(round_dp(pct, 4)),
    }
}

pub fn analyze_long_short_ratio(ratio: Option<f64>) -> MetricAnalysis {
    let Some(ratio) = ratio else {
        return MetricAnalysis::no_data();
    };

    let (signal, description) = if ratio > 2.0 {
        (Bias::Bearish, format!("Extremely long-heavy ({ratio:.2}) - potential squeeze down"))
    } else if ratio > 1.5 {
        (Bias::SlightlyBearish, format!("Long-heavy ({ratio:.2})"))
    } else if ratio < 0.5 {
        (Bias::Bullish, format!("Extremely short-heavy ({ratio:.2}) - potential squeeze up"))
    } else if ratio < 0.7 {
        (Bias::SlightlyBullish, format!("Short-heavy ({ratio:.2})"))
    } else {
        (Bias::Neutral, format!("Balanced ({ratio:.2})"))
    };

    MetricAnalysis {
        signal,
        description,
        value: Some(round_dp(ratio, 2)),
    }
}

pub fn derivatives_summary(snapshots: &[DerivativesSnapshot]) -> Vec<DerivativesSummary> {
    snapshots
        .iter()
        .map(|d| DerivativesSummary {
            coin_id: d.coin_id.clone(),
            symbol: d.symbol.clone(),
            funding_rate: analyze_funding_rate(d.funding_rate),
            long_short_ratio: analyze_long_short_ratio(d.long_short_ratio),
            open_interest: d.open_interest,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn funding_bias_and_percent_value() {
        let a = analyze_funding_rate(Some(0.0015));
        assert_eq!(a.signal, Bias::Bearish);
        assert_eq!(a.value, Some(0.15));
        assert!(a.description.contains("0.1500%"));

        assert_eq!(analyze_funding_rate(Some(0.0001)).signal, Bias::Neutral);
        assert_eq!(analyze_funding_rate(Some(-0.0007)).signal, Bias::SlightlyBullish);
        assert_eq!(analyze_funding_rate(Some(-0.002)).signal, Bias::Bullish);
    }

    #[test]
    fn missing_metrics_read_no_data() {
        let a = analyze_funding_rate(None);
        assert_eq!(a.signal, Bias::Neutral);
        assert_eq!(a.value, None);
        assert_eq!(analyze_long_short_ratio(None).description, "No data");
    }

    #[test]
    fn long_short_bias() {
        assert_eq!(analyze_long_short_ratio(Some(2.346)).value, Some(2.35));
        assert_eq!(analyze_long_short_ratio(Some(2.346)).signal, Bias::Bearish);
        assert_eq!(analyze_long_short_ratio(Some(1.6)).signal, Bias::SlightlyBearish);
        assert_eq!(analyze_long_short_ratio(Some(1.0)).signal, Bias::Neutral);
        assert_eq!(analyze_long_short_ratio(Some(0.6)).signal, Bias::SlightlyBullish);
        assert_eq!(analyze_long_short_ratio(Some(0.4)).signal, Bias::Bullish);
    }

    #[test]
    fn summary_keeps_order_and_open_interest() {
        let snaps = vec![
            DerivativesSnapshot {
                coin_id: "bitcoin".into(),
                symbol: "BTC".into(),
                funding_rate: Some(0.0001),
                open_interest: Some(82_000.0),
                long_short_ratio: Some(1.1),
            },
            DerivativesSnapshot {
                coin_id: "ethereum".into(),
                symbol: "ETH".into(),
                ..Default::default()
            },
        ];
        let out = derivatives_summary(&snaps);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].symbol, "BTC");
        assert_eq!(out[0].open_interest, Some(82_000.0));
        assert_eq!(out[1].funding_rate.value, None);
    }
}
