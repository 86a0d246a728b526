// =============================================================================
// Shared types — provider payload records used across the service
// =============================================================================
//
// Every provider response is reshaped into one of these explicit records
// before it is cached. Optional upstream fields stay `Option` so scorers can
// tell "field missing" apart from a real value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Five-state directional classification shared by the OBV trend and the
/// derivatives analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    SlightlyBullish,
    #[default]
    Neutral,
    SlightlyBearish,
    Bearish,
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::SlightlyBullish => write!(f, "slightly_bullish"),
            Self::Neutral => write!(f, "neutral"),
            Self::SlightlyBearish => write!(f, "slightly_bearish"),
            Self::Bearish => write!(f, "bearish"),
        }
    }
}

/// One OHLC(V) bar. `time` is the open time in UNIX seconds. CoinGecko OHLC
/// carries no volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// A row of the CoinGecko `/coins/markets` listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
}

impl CoinMarket {
    /// 24h change, preferring the currency-adjusted figure.
    pub fn change_24h(&self) -> Option<f64> {
        self.price_change_percentage_24h_in_currency
            .or(self.price_change_percentage_24h)
    }
}

/// CoinGecko `/global` payload (the inner `data` object).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalMarket {
    #[serde(default)]
    pub total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    pub total_volume: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap_change_percentage_24h_usd: Option<f64>,
    #[serde(default)]
    pub active_cryptocurrencies: Option<u64>,
}

/// One Fear & Greed reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FearGreedPoint {
    pub value: u32,
    pub classification: String,
    pub timestamp: String,
}

/// Latest Fear & Greed reading plus the requested history (newest first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FearGreedIndex {
    pub value: u32,
    pub classification: String,
    pub timestamp: String,
    #[serde(default)]
    pub history: Vec<FearGreedPoint>,
}

/// A news article with its keyword sentiment in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_on: i64,
    pub sentiment: f64,
    pub image: String,
}

/// Aggregate sentiment across the latest news articles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSentiment {
    /// Mean article sentiment in [-1, 1].
    pub score: f64,
    pub label: String,
    pub article_count: usize,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl NewsSentiment {
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            label: "Neutral".to_string(),
            article_count: 0,
            positive: 0,
            negative: 0,
            neutral: 0,
        }
    }
}

/// Futures positioning for one coin. Each metric is `None` when its
/// endpoint returned nothing usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivativesSnapshot {
    pub coin_id: String,
    pub symbol: String,
    /// Latest funding rate as a decimal (0.0001 = 0.01%).
    #[serde(default)]
    pub funding_rate: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub long_short_ratio: Option<f64>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Round `value` to `dp` decimal places.
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10_f64.powi(dp);
    (value * factor).round() / factor
}
