// =============================================================================
// Exponential Moving Average (EMA) and the short/long crossover
// =============================================================================
//
//   k      = 2 / (period + 1)
//   EMA_t  = close_t * k + EMA_{t-1} * (1 - k),  seeded with SMA(period)
//
// Element `i` of an EMA series corresponds to input index `i + period - 1`.
// =============================================================================

use super::{Crossover, EmaCrossoverReading};
use crate::types::round_dp;

/// EMA series for `values`. Empty when the input is shorter than `period`;
/// stops at the first non-finite value.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period + 1) as f64;
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut series = Vec::with_capacity(values.len() - period + 1);
    series.push(seed);

    let mut prev = seed;
    for &v in &values[period..] {
        let ema = v * k + prev * (1.0 - k);
        if !ema.is_finite() {
            break;
        }
        series.push(ema);
        prev = ema;
    }

    series
}

/// Classify the sign change of `fast - slow` between the previous and the
/// latest point.
pub(crate) fn detect_crossover(prev_diff: f64, curr_diff: f64) -> Crossover {
    if prev_diff <= 0.0 && curr_diff > 0.0 {
        Crossover::Bullish
    } else if prev_diff >= 0.0 && curr_diff < 0.0 {
        Crossover::Bearish
    } else {
        Crossover::Neutral
    }
}

/// Latest short/long EMA values and whether they crossed on the last bar.
pub fn ema_crossover_reading(closes: &[f64], short: usize, long: usize) -> EmaCrossoverReading {
    let short_ema = calculate_ema(closes, short);
    let long_ema = calculate_ema(closes, long);

    let mut reading = EmaCrossoverReading {
        ema_short: short_ema.last().map(|v| round_dp(*v, 4)),
        ema_long: long_ema.last().map(|v| round_dp(*v, 4)),
        crossover: Crossover::Neutral,
    };

    // Align both series on the close index of the long EMA.
    let offset = long.saturating_sub(short);
    let diff = |i: usize| -> Option<f64> { Some(short_ema.get(i + offset)? - long_ema.get(i)?) };

    if long_ema.len() >= 2 {
        let last = long_ema.len() - 1;
        if let (Some(prev), Some(curr)) = (diff(last - 1), diff(last)) {
            reading.crossover = detect_crossover(prev, curr);
        }
    }

    reading
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_edge_cases() {
        assert!(calculate_ema(&[], 5).is_empty());
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).is_empty());
        assert!(calculate_ema(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn ema_seed_is_sma() {
        let ema = calculate_ema(&[2.0, 4.0, 6.0], 3);
        assert_eq!(ema.len(), 1);
        assert!((ema[0] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn ema_known_values() {
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = calculate_ema(&closes, 5);
        assert_eq!(ema.len(), 6);

        let k = 1.0 / 3.0;
        let mut expected = 3.0;
        for (i, &c) in closes[5..].iter().enumerate() {
            expected = c * k + expected * (1.0 - k);
            assert!((ema[i + 1] - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn ema_stops_at_nan() {
        let ema = calculate_ema(&[1.0, 2.0, 3.0, f64::NAN, 5.0], 3);
        assert_eq!(ema.len(), 1);
    }

    #[test]
    fn crossover_detection() {
        assert_eq!(detect_crossover(-1.0, 0.5), Crossover::Bullish);
        assert_eq!(detect_crossover(0.0, 0.5), Crossover::Bullish);
        assert_eq!(detect_crossover(1.0, -0.5), Crossover::Bearish);
        assert_eq!(detect_crossover(1.0, 2.0), Crossover::Neutral);
        assert_eq!(detect_crossover(0.0, 0.0), Crossover::Neutral);
    }

    #[test]
    fn steady_uptrend_has_short_above_long_without_cross() {
        let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let reading = ema_crossover_reading(&closes, 9, 21);
        assert!(reading.ema_short.unwrap() > reading.ema_long.unwrap());
        assert_eq!(reading.crossover, Crossover::Neutral);
    }

    #[test]
    fn reversal_produces_bullish_cross() {
        // Long decline, then a single sharp jump on the last bar.
        let mut closes: Vec<f64> = (0..40).map(|x| 100.0 - x as f64).collect();
        closes.push(200.0);
        let reading = ema_crossover_reading(&closes, 9, 21);
        assert_eq!(reading.crossover, Crossover::Bullish);
    }

    #[test]
    fn short_input_has_no_values() {
        let reading = ema_crossover_reading(&[1.0, 2.0, 3.0], 9, 21);
        assert_eq!(reading, EmaCrossoverReading::default());
    }
}
