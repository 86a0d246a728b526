// =============================================================================
// Analysis Module
// =============================================================================
//
// Derived market views built on top of cached provider data:
// - derivatives: per-coin funding / long-short interpretation
// - market_score: 0-100 overall market health score
// - volume_anomaly: rolling-baseline volume spike detection

pub mod derivatives;
pub mod market_score;
pub mod volume_anomaly;

pub use derivatives::derivatives_summary;
pub use market_score::{compute_market_score, MarketScore};
pub use volume_anomaly::VolumeAnomalyDetector;
