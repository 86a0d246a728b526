// =============================================================================
// Signals Module
// =============================================================================
//
// Four-layer composite signal pipeline:
// - technical: RSI, Stoch-RSI, MACD, Bollinger %B, EMA crossover
// - volume: OBV trend plus the volume-anomaly flag
// - sentiment: Fear & Greed (contrarian) and amplified news sentiment
// - derivatives: funding rate and long/short ratio (contrarian)
// - composite: weighted combination into label / score / confidence
//
// Every scorer is pure, synchronous and returns a value in [-1.0, +1.0].
// Missing input scores exactly 0.0: absence is indistinguishable from a
// genuinely neutral reading.

pub mod composite;
pub mod derivatives;
pub mod sentiment;
pub mod technical;
pub mod volume;

pub use composite::{generate_composite_signal, CompositeSignal, LayerWeights, SignalInputs};
pub use derivatives::derivatives_score;
pub use sentiment::sentiment_score;
pub use technical::technical_score;
pub use volume::volume_score;

/// Arithmetic mean; 0.0 for an empty slice.
pub(crate) fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}
