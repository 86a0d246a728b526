// =============================================================================
// Stochastic RSI
// =============================================================================
//
//   stoch_t = (RSI_t - min(RSI, period)) / (max(RSI, period) - min(RSI, period))
//   %K      = SMA(stoch, smooth_k)
//   %D      = SMA(%K, smooth_d)
//
// Reported on a 0-100 scale. Zones: %K <= 20 oversold, %K >= 80 overbought.
// A window where RSI did not move has no stochastic value.

use super::rsi::calculate_rsi;
use super::{StochRsiReading, Zone};
use crate::types::round_dp;

/// Raw stochastic of the RSI series in [0, 1]; `None` for flat windows.
fn stoch_series(rsi: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || rsi.len() < period {
        return Vec::new();
    }
    rsi.windows(period)
        .map(|w| {
            let lo = w.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let last = w[w.len() - 1];
            (hi > lo).then(|| (last - lo) / (hi - lo))
        })
        .collect()
}

/// Simple moving average that yields `None` whenever the window contains a
/// missing value.
fn sma_opt(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| {
            let sum: Option<f64> = w.iter().copied().sum();
            sum.map(|s| s / window as f64)
        })
        .collect()
}

pub fn stoch_rsi_reading(
    closes: &[f64],
    period: usize,
    smooth_k: usize,
    smooth_d: usize,
) -> StochRsiReading {
    let rsi = calculate_rsi(closes, period);
    let k_series = sma_opt(&stoch_series(&rsi, period), smooth_k);
    let d_series = sma_opt(&k_series, smooth_d);

    let k = k_series.last().copied().flatten().map(|v| v * 100.0);
    let d = d_series.last().copied().flatten().map(|v| v * 100.0);

    let signal = match k {
        Some(v) if v <= 20.0 => Zone::Oversold,
        Some(v) if v >= 80.0 => Zone::Overbought,
        _ => Zone::Neutral,
    };

    StochRsiReading {
        k: k.map(|v| round_dp(v, 2)),
        d: d.map(|v| round_dp(v, 2)),
        signal,
    }
}
