// =============================================================================
// Volume Layer Scorer
// =============================================================================
//
// OBV trend: bullish +0.8, slightly_bullish +0.3, neutral 0.0,
//            slightly_bearish -0.3, bearish -0.8.
//
// A flagged volume anomaly adds a flat +0.2 into the mean whatever the
// direction of the move.

use super::mean;
use crate::analysis::volume_anomaly::VolumeAnomaly;
use crate::indicators::ObvReading;
use crate::types::Bias;

const ANOMALY_CONTRIBUTION: f64 = 0.2;

pub fn volume_score(obv: Option<&ObvReading>, anomaly: Option<&VolumeAnomaly>) -> f64 {
    let trend = obv.map(|o| o.trend).unwrap_or_default();
    let mut scores = vec![trend_score(trend)];

    if anomaly.is_some_and(|a| a.is_anomaly) {
        scores.push(ANOMALY_CONTRIBUTION);
    }

    mean(&scores)
}

fn trend_score(trend: Bias) -> f64 {
    match trend {
        Bias::Bullish => 0.8,
        Bias::SlightlyBullish => 0.3,
        Bias::Neutral => 0.0,
        Bias::SlightlyBearish => -0.3,
        Bias::Bearish => -0.8,
    }
}
