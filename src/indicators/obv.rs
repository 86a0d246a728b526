// =============================================================================
// On-Balance Volume (OBV) trend
// =============================================================================
//
// OBV adds the bar volume when the close is not lower than the previous close
// and subtracts it otherwise. The trend is read from the last five OBV points:
// monotonically non-decreasing => bullish, non-increasing => bearish, else the
// sign of (last - first) picks slightly bullish / slightly bearish.

use super::ObvReading;
use crate::types::{round_dp, Bias};

const TREND_WINDOW: usize = 5;

/// Cumulative OBV series. Empty when the inputs differ in length.
pub fn calculate_obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    if closes.len() != volumes.len() {
        return Vec::new();
    }

    let mut total = 0.0;
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            let down = i > 0 && close < closes[i - 1];
            total += if down { -volume } else { volume };
            total
        })
        .collect()
}

pub fn obv_reading(closes: &[f64], volumes: &[f64]) -> ObvReading {
    let obv = calculate_obv(closes, volumes);
    if obv.len() < TREND_WINDOW {
        return ObvReading::default();
    }

    let recent = &obv[obv.len() - TREND_WINDOW..];
    let rising = recent.windows(2).all(|w| w[1] >= w[0]);
    let falling = recent.windows(2).all(|w| w[1] <= w[0]);
    let slope = recent[TREND_WINDOW - 1] - recent[0];

    let trend = if rising {
        Bias::Bullish
    } else if falling {
        Bias::Bearish
    } else if slope > 0.0 {
        Bias::SlightlyBullish
    } else if slope < 0.0 {
        Bias::SlightlyBearish
    } else {
        Bias::Neutral
    };

    let last = recent[TREND_WINDOW - 1];
    ObvReading {
        trend,
        value: last.is_finite().then(|| round_dp(last, 2)),
    }
}
