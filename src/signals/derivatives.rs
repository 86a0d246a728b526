// =============================================================================
// Derivatives Layer Scorer — contrarian futures positioning
// =============================================================================
//
// Funding rate (decimal):  >0.001 => -0.8   >0.0005 => -0.3
//                          <-0.001 => +0.8  <-0.0005 => +0.3   else 0.0
// Long/short ratio:        >2.0 => -0.5   >1.5 => -0.2
//                          <0.5 => +0.5   <0.7 => +0.2        else 0.0
//
// High positive funding and long-heavy books signal crowded longs (bearish);
// the mirror cases signal short-squeeze risk (bullish).

use super::mean;
use crate::types::DerivativesSnapshot;

pub fn derivatives_score(snapshot: Option<&DerivativesSnapshot>) -> f64 {
    let Some(snapshot) = snapshot else {
        return 0.0;
    };

    let mut scores = Vec::with_capacity(2);
    if let Some(rate) = snapshot.funding_rate {
        scores.push(funding_score(rate));
    }
    if let Some(ratio) = snapshot.long_short_ratio {
        scores.push(long_short_score(ratio));
    }

    mean(&scores)
}

fn funding_score(rate: f64) -> f64 {
    if rate > 0.001 {
        -0.8
    } else if rate > 0.0005 {
        -0.3
    } else if rate < -0.001 {
        0.8
    } else if rate < -0.0005 {
        0.3
    } else {
        0.0
    }
}

fn long_short_score(ratio: f64) -> f64 {
    if ratio > 2.0 {
        -0.5
    } else if ratio > 1.5 {
        -0.2
    } else if ratio < 0.5 {
        0.5
    } else if ratio < 0.7 {
        0.2
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(funding_rate: Option<f64>, long_short_ratio: Option<f64>) -> DerivativesSnapshot {
        DerivativesSnapshot {
            coin_id: "bitcoin".into(),
            symbol: "BTC".into(),
            funding_rate,
            open_interest: Some(1_000.0),
            long_short_ratio,
        }
    }

    #[test]
    fn no_data_is_exactly_zero() {
        assert_eq!(derivatives_score(None), 0.0);
        assert_eq!(derivatives_score(Some(&snap(None, None))), 0.0);
    }

    #[test]
    fn funding_buckets_use_strict_bounds() {
        let f = |r| derivatives_score(Some(&snap(Some(r), None)));
        assert_eq!(f(0.0011), -0.8);
        assert_eq!(f(0.001), -0.3);
        assert_eq!(f(0.0005), 0.0);
        assert_eq!(f(0.0001), 0.0);
        assert_eq!(f(-0.0006), 0.3);
        assert_eq!(f(-0.001), 0.3);
        assert_eq!(f(-0.002), 0.8);
    }

    #[test]
    fn long_short_buckets() {
        let l = |r| derivatives_score(Some(&snap(None, Some(r))));
        assert_eq!(l(2.5), -0.5);
        assert_eq!(l(2.0), -0.2);
        assert_eq!(l(1.5), 0.0);
        assert_eq!(l(1.0), 0.0);
        assert_eq!(l(0.7), 0.0);
        assert_eq!(l(0.6), 0.2);
        assert_eq!(l(0.5), 0.2);
        assert_eq!(l(0.3), 0.5);
    }

    #[test]
    fn crowded_longs_on_both_metrics() {
        let score = derivatives_score(Some(&snap(Some(0.002), Some(3.0))));
        assert!((score - (-0.65)).abs() < 1e-12);
    }
}
