// =============================================================================
// Relative Strength Index (RSI) — Wilder's smoothing
// =============================================================================
//
//   avg_gain_0 = SMA(gains[..period]),  avg_loss_0 = SMA(losses[..period])
//   avg_t      = (avg_{t-1} * (period - 1) + x_t) / period
//   RSI        = 100 - 100 / (1 + avg_gain / avg_loss)
//
// Zones: RSI <= 30 => oversold, RSI >= 70 => overbought.
// =============================================================================

use super::{RsiReading, Zone};
use crate::types::round_dp;

/// Full RSI series: one value per close from index `period` onwards.
///
/// Empty when `period == 0` or there are fewer than `period + 1` closes. The
/// series stops at the first non-finite value.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    let (seed_gain, seed_loss) = deltas[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });
    let mut avg_gain = seed_gain / period_f;
    let mut avg_loss = seed_loss / period_f;

    let mut series = Vec::with_capacity(deltas.len() - period + 1);
    let Some(first) = rsi_from_averages(avg_gain, avg_loss) else {
        return series;
    };
    series.push(first);

    for &delta in &deltas[period..] {
        avg_gain = (avg_gain * (period_f - 1.0) + delta.max(0.0)) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + (-delta).max(0.0)) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => series.push(rsi),
            None => break,
        }
    }

    series
}

/// Latest RSI as a reading. The value is `None` when it cannot be computed.
pub fn rsi_reading(closes: &[f64], period: usize) -> RsiReading {
    let Some(value) = calculate_rsi(closes, period).last().copied() else {
        return RsiReading::default();
    };

    let signal = if value <= 30.0 {
        Zone::Oversold
    } else if value >= 70.0 {
        Zone::Overbought
    } else {
        Zone::Neutral
    };

    RsiReading {
        value: Some(round_dp(value, 2)),
        signal,
    }
}

/// Both averages zero => 50 (no movement); only gains => 100.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };

    rsi.is_finite().then_some(rsi)
}
