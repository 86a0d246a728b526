// =============================================================================
// Composite Signal Engine — weighted four-layer aggregation
// =============================================================================
//
// raw   = technical*w_t + volume*w_v + sentiment*w_s + derivatives*w_d
// score = clamp(raw, -1, 1)
//
// Label thresholds are closed and checked in order:
//   >= 0.5 STRONG_BUY, >= 0.2 BUY, <= -0.5 STRONG_SELL, <= -0.2 SELL, else NEUTRAL
// Confidence buckets |score|: >= 0.5 High, >= 0.2 Medium, else Low.
//
// Label and confidence are decided on the unrounded score; the emitted score
// and layers are rounded to 3 decimals afterwards.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::{derivatives_score, sentiment_score, technical_score, volume_score};
use crate::analysis::volume_anomaly::VolumeAnomaly;
use crate::indicators::TechnicalIndicators;
use crate::types::{round_dp, DerivativesSnapshot, FearGreedIndex, NewsSentiment};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
const OUTPUT_DP: i32 = 3;

// ---- Weights ----

/// Per-layer weights. Fixed for the lifetime of the process once validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerWeights {
    pub technical: f64,
    pub volume: f64,
    pub sentiment: f64,
    pub derivatives: f64,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self {
            technical: 0.40,
            volume: 0.25,
            sentiment: 0.20,
            derivatives: 0.15,
        }
    }
}

impl LayerWeights {
    /// Weights must be finite, non-negative and sum to 1.0.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("technical", self.technical),
            ("volume", self.volume),
            ("sentiment", self.sentiment),
            ("derivatives", self.derivatives),
        ];
        for (name, w) in named {
            if !w.is_finite() || w < 0.0 {
                bail!("layer weight '{name}' must be a finite non-negative number, got {w}");
            }
        }

        let sum = self.technical + self.volume + self.sentiment + self.derivatives;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            bail!("layer weights must sum to 1.0, got {sum}");
        }
        Ok(())
    }
}

// ---- Output ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalLabel {
    StrongSell,
    Sell,
    Neutral,
    Buy,
    StrongBuy,
}

impl SignalLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.5 {
            Self::StrongBuy
        } else if score >= 0.2 {
            Self::Buy
        } else if score <= -0.5 {
            Self::StrongSell
        } else if score <= -0.2 {
            Self::Sell
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Neutral => "NEUTRAL",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        }
    }
}

impl std::fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_score(score: f64) -> Self {
        let magnitude = score.abs();
        if magnitude >= 0.5 {
            Self::High
        } else if magnitude >= 0.2 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerScores {
    pub technical: f64,
    pub volume: f64,
    pub sentiment: f64,
    pub derivatives: f64,
}

/// The composite decision for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSignal {
    pub label: SignalLabel,
    pub score: f64,
    pub confidence: Confidence,
    pub layers: LayerScores,
}

impl CompositeSignal {
    /// Fail-soft result when no usable data exists.
    pub fn neutral() -> Self {
        Self {
            label: SignalLabel::Neutral,
            score: 0.0,
            confidence: Confidence::Low,
            layers: LayerScores::default(),
        }
    }
}

// ---- Combination ----

/// Combine four layer scores into one signal.
///
/// Layer inputs are clamped to [-1, 1]; a NaN layer counts as 0.0.
pub fn combine(
    technical: f64,
    volume: f64,
    sentiment: f64,
    derivatives: f64,
    weights: &LayerWeights,
) -> CompositeSignal {
    let layers = LayerScores {
        technical: sanitize(technical),
        volume: sanitize(volume),
        sentiment: sanitize(sentiment),
        derivatives: sanitize(derivatives),
    };

    let raw = layers.technical * weights.technical
        + layers.volume * weights.volume
        + layers.sentiment * weights.sentiment
        + layers.derivatives * weights.derivatives;
    let score = if raw.is_finite() { raw.clamp(-1.0, 1.0) } else { 0.0 };

    CompositeSignal {
        label: SignalLabel::from_score(score),
        score: round_dp(score, OUTPUT_DP),
        confidence: Confidence::from_score(score),
        layers: LayerScores {
            technical: round_dp(layers.technical, OUTPUT_DP),
            volume: round_dp(layers.volume, OUTPUT_DP),
            sentiment: round_dp(layers.sentiment, OUTPUT_DP),
            derivatives: round_dp(layers.derivatives, OUTPUT_DP),
        },
    }
}

fn sanitize(layer: f64) -> f64 {
    if layer.is_nan() {
        0.0
    } else {
        layer.clamp(-1.0, 1.0)
    }
}

/// Everything the four scorers consume for one asset. Any input may be
/// missing; a missing input scores 0.0 in its layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalInputs<'a> {
    pub indicators: Option<&'a TechnicalIndicators>,
    pub volume_anomaly: Option<&'a VolumeAnomaly>,
    pub fear_greed: Option<&'a FearGreedIndex>,
    pub news: Option<&'a NewsSentiment>,
    pub derivatives: Option<&'a DerivativesSnapshot>,
}

pub fn generate_composite_signal(inputs: &SignalInputs<'_>, weights: &LayerWeights) -> CompositeSignal {
    let technical = technical_score(inputs.indicators);
    let volume = volume_score(
        inputs.indicators.and_then(|i| i.obv.as_ref()),
        inputs.volume_anomaly,
    );
    let sentiment = sentiment_score(inputs.fear_greed, inputs.news);
    let derivatives = derivatives_score(inputs.derivatives);

    combine(technical, volume, sentiment, derivatives, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{
        BollingerReading, Crossover, EmaCrossoverReading, MacdReading, RsiReading, StochRsiReading,
    };

    fn oversold_indicators() -> TechnicalIndicators {
        TechnicalIndicators {
            rsi: Some(RsiReading {
                value: Some(15.0),
                ..Default::default()
            }),
            stoch_rsi: Some(StochRsiReading {
                k: Some(10.0),
                ..Default::default()
            }),
            macd: Some(MacdReading {
                crossover: Crossover::Bullish,
                ..Default::default()
            }),
            bollinger_bands: Some(BollingerReading {
                percent_b: Some(0.5),
                ..Default::default()
            }),
            ema_crossover: Some(EmaCrossoverReading {
                ema_short: Some(101.0),
                ema_long: Some(100.0),
                crossover: Crossover::Neutral,
            }),
            obv: None,
        }
    }

    #[test]
    fn default_weights_are_valid() {
        LayerWeights::default().validate().unwrap();
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let mut w = LayerWeights::default();
        w.technical = 0.5;
        assert!(w.validate().is_err());

        let w = LayerWeights {
            technical: 1.2,
            volume: -0.2,
            sentiment: 0.0,
            derivatives: 0.0,
        };
        assert!(w.validate().is_err());

        let w = LayerWeights {
            technical: f64::NAN,
            ..LayerWeights::default()
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn no_data_is_neutral_low_confidence() {
        let signal = generate_composite_signal(&SignalInputs::default(), &LayerWeights::default());
        assert_eq!(signal, CompositeSignal::neutral());
    }

    #[test]
    fn oversold_technicals_give_buy_medium() {
        let ind = oversold_indicators();
        let inputs = SignalInputs {
            indicators: Some(&ind),
            ..Default::default()
        };
        let signal = generate_composite_signal(&inputs, &LayerWeights::default());

        assert_eq!(signal.layers.technical, 0.6);
        assert_eq!(signal.score, 0.24);
        assert_eq!(signal.label, SignalLabel::Buy);
        assert_eq!(signal.confidence, Confidence::Medium);
    }

    #[test]
    fn extreme_fear_alone_lands_exactly_on_buy_threshold() {
        let fg = FearGreedIndex {
            value: 10,
            classification: "Extreme Fear".into(),
            timestamp: String::new(),
            history: Vec::new(),
        };
        let inputs = SignalInputs {
            fear_greed: Some(&fg),
            ..Default::default()
        };
        let signal = generate_composite_signal(&inputs, &LayerWeights::default());

        assert_eq!(signal.layers.sentiment, 1.0);
        assert_eq!(signal.score, 0.2);
        assert_eq!(signal.label, SignalLabel::Buy);
        assert_eq!(signal.confidence, Confidence::Medium);
    }

    #[test]
    fn combine_is_deterministic() {
        let w = LayerWeights::default();
        let a = combine(0.31, -0.2, 0.75, -0.4, &w);
        let b = combine(0.31, -0.2, 0.75, -0.4, &w);
        assert_eq!(a, b);
    }

    #[test]
    fn label_is_monotone_in_score() {
        let w = LayerWeights::default();
        let mut prev = SignalLabel::StrongSell;
        for step in -100..=100 {
            let t = step as f64 / 100.0;
            let signal = combine(t, t, t, t, &w);
            assert!(signal.label >= prev, "label regressed at {t}");
            prev = signal.label;
        }
        assert_eq!(prev, SignalLabel::StrongBuy);
    }

    #[test]
    fn thresholds_are_closed() {
        assert_eq!(SignalLabel::from_score(0.5), SignalLabel::StrongBuy);
        assert_eq!(SignalLabel::from_score(0.4999), SignalLabel::Buy);
        assert_eq!(SignalLabel::from_score(0.1999), SignalLabel::Neutral);
        assert_eq!(SignalLabel::from_score(-0.2), SignalLabel::Sell);
        assert_eq!(SignalLabel::from_score(-0.5), SignalLabel::StrongSell);
        assert_eq!(Confidence::from_score(-0.5), Confidence::High);
        assert_eq!(Confidence::from_score(0.2), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.19), Confidence::Low);
    }

    #[test]
    fn output_is_bounded_and_finite() {
        let w = LayerWeights::default();
        for v in [-5.0, -1.0, 0.0, 1.0, 5.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let s = combine(v, v, v, v, &w);
            assert!(s.score.is_finite());
            assert!((-1.0..=1.0).contains(&s.score), "{v} => {}", s.score);
            for layer in [s.layers.technical, s.layers.volume, s.layers.sentiment, s.layers.derivatives] {
                assert!((-1.0..=1.0).contains(&layer));
            }
        }
    }

    #[test]
    fn serialized_shape() {
        let signal = combine(1.0, 0.0, 0.0, 0.0, &LayerWeights::default());
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["label"], "BUY");
        assert_eq!(json["confidence"], "Medium");
        assert_eq!(json["score"], 0.4);
        assert_eq!(json["layers"]["technical"], 1.0);
        assert_eq!(json["layers"]["derivatives"], 0.0);
    }
}
