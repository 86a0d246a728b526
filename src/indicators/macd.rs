// =============================================================================
// MACD — Moving Average Convergence / Divergence
// =============================================================================
//
//   macd      = EMA(fast) - EMA(slow)
//   signal    = EMA(signal_period) of the macd line
//   histogram = macd - signal
//
// A crossover is reported when `macd - signal` changes sign on the last bar.
// =============================================================================

use super::ema::{calculate_ema, detect_crossover};
use super::{Crossover, MacdReading};
use crate::types::round_dp;

/// Macd line aligned on the slow EMA: element `i` belongs to close index
/// `i + slow - 1`.
pub fn macd_line(closes: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    if fast == 0 || slow <= fast {
        return Vec::new();
    }
    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);
    let offset = slow - fast;

    slow_ema
        .iter()
        .enumerate()
        .map_while(|(i, s)| fast_ema.get(i + offset).map(|f| f - s))
        .collect()
}

pub fn macd_reading(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdReading {
    let line = macd_line(closes, fast, slow);
    let signal = calculate_ema(&line, signal_period);

    let mut reading = MacdReading {
        macd_line: line.last().map(|v| round_dp(*v, 4)),
        signal_line: signal.last().map(|v| round_dp(*v, 4)),
        histogram: None,
        crossover: Crossover::Neutral,
    };

    if signal.is_empty() || signal_period == 0 {
        return reading;
    }

    // Signal element `j` belongs to macd element `j + signal_period - 1`.
    let offset = signal_period - 1;
    let diff = |j: usize| -> Option<f64> { Some(line.get(j + offset)? - signal.get(j)?) };

    let last = signal.len() - 1;
    let curr = diff(last);
    reading.histogram = curr.map(|h| round_dp(h, 4));

    if last >= 1 {
        if let (Some(prev), Some(curr)) = (diff(last - 1), curr) {
            reading.crossover = detect_crossover(prev, curr);
        }
    }

    reading
}
