// =============================================================================
// Bollinger Bands and %B
// =============================================================================
//
// middle = SMA(period), upper/lower = middle ± k·σ (population σ).
// %B = (close - lower) / (upper - lower): 0 at the lower band, 1 at the upper,
// outside [0, 1] when price closes beyond a band.

use super::BollingerReading;
use crate::types::round_dp;

#[derive(Debug, Clone)]
pub struct BollingerResult {
    pub upper: f64,
    pub lower: f64,
    /// %B of the latest close. `None` when the bands collapse (flat window).
    pub percent_b: Option<f64>,
}

/// Bands over the last `period` closes.
///
/// Returns `None` with fewer than `period` closes or a non-finite result.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerResult> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;
    if !upper.is_finite() || !lower.is_finite() {
        return None;
    }

    let last = *window.last()?;
    let band = upper - lower;
    let percent_b = if band > 0.0 {
        Some((last - lower) / band).filter(|v| v.is_finite())
    } else {
        None
    };

    Some(BollingerResult {
        upper,
        lower,
        percent_b,
    })
}

pub fn bollinger_reading(closes: &[f64], period: usize, num_std: f64) -> BollingerReading {
    match calculate_bollinger(closes, period, num_std) {
        Some(bb) => BollingerReading {
            upper: Some(round_dp(bb.upper, 4)),
            lower: Some(round_dp(bb.lower, 4)),
            percent_b: bb.percent_b.map(|v| round_dp(v, 4)),
        },
        None => BollingerReading::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_surround_the_mean() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = calculate_bollinger(&closes, 20, 2.0).unwrap();
        // Bands sit symmetrically around the SMA of 1..=20.
        assert!(bb.upper > 10.5 && bb.lower < 10.5);
        assert!(((bb.upper + bb.lower) / 2.0 - 10.5).abs() < 1e-10);
        // Last close (20) sits inside the upper half of the bands.
        let pb = bb.percent_b.unwrap();
        assert!(pb > 0.5 && pb < 1.0);
    }

    #[test]
    fn insufficient_data() {
        assert!(calculate_bollinger(&[1.0, 2.0, 3.0], 20, 2.0).is_none());
        assert_eq!(bollinger_reading(&[1.0], 20, 2.0), BollingerReading::default());
    }

    #[test]
    fn flat_window_has_no_percent_b() {
        let bb = calculate_bollinger(&[100.0; 20], 20, 2.0).unwrap();
        assert!((bb.upper - bb.lower).abs() < 1e-12);
        assert!(bb.percent_b.is_none());
    }

    #[test]
    fn close_above_upper_band() {
        let mut closes = vec![100.0; 19];
        closes.push(130.0);
        let pb = calculate_bollinger(&closes, 20, 2.0).unwrap().percent_b.unwrap();
        assert!(pb > 1.0);
    }
}
