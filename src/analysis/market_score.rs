// =============================================================================
// Market Health Score — 0..100 blend of four market-wide inputs
// =============================================================================
//
//   fear_greed    30%   index value as-is
//   market_trend  20%   clamp(50 + mcap_change_24h * 5, 0, 100)
//   momentum      30%   share of top coins green over 24h, in percent
//   news          20%   clamp(50 + news_score * 50, 0, 100)
//
// Any missing component defaults to 50 (neutral).

use serde::{Deserialize, Serialize};

use crate::types::{round_dp, CoinMarket, FearGreedIndex, GlobalMarket, NewsSentiment};

const NEUTRAL_COMPONENT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub fear_greed: f64,
    pub market_trend: f64,
    pub momentum: f64,
    pub news: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketScore {
    pub score: f64,
    pub label: String,
    pub components: ScoreComponents,
}

pub fn compute_market_score(
    fear_greed: Option<&FearGreedIndex>,
    global: Option<&GlobalMarket>,
    news: Option<&NewsSentiment>,
    top_coins: &[CoinMarket],
) -> MarketScore {
    let fear_greed = fear_greed.map_or(NEUTRAL_COMPONENT, |fg| f64::from(fg.value));

    let market_trend = global
        .and_then(|g| g.market_cap_change_percentage_24h_usd)
        .map_or(NEUTRAL_COMPONENT, |change| (50.0 + change * 5.0).clamp(0.0, 100.0));

    let momentum = if top_coins.is_empty() {
        NEUTRAL_COMPONENT
    } else {
        let green = top_coins
            .iter()
            .filter(|c| c.change_24h().unwrap_or(0.0) > 0.0)
            .count();
        green as f64 / top_coins.len() as f64 * 100.0
    };

    let news = news
        .filter(|n| n.score.is_finite())
        .map_or(NEUTRAL_COMPONENT, |n| (50.0 + n.score * 50.0).clamp(0.0, 100.0));

    let composite = fear_greed * 0.30 + market_trend * 0.20 + momentum * 0.30 + news * 0.20;

    MarketScore {
        score: round_dp(composite, 1),
        label: health_label(composite).to_string(),
        components: ScoreComponents {
            fear_greed: round_dp(fear_greed, 1),
            market_trend: round_dp(market_trend, 1),
            momentum: round_dp(momentum, 1),
            news: round_dp(news, 1),
        },
    }
}

fn health_label(score: f64) -> &'static str {
    if score >= 75.0 {
        "Very Bullish"
    } else if score >= 60.0 {
        "Bullish"
    } else if score >= 40.0 {
        "Neutral"
    } else if score >= 25.0 {
        "Bearish"
    } else {
        "Very Bearish"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(change: Option<f64>) -> CoinMarket {
        CoinMarket {
            id: "x".into(),
            price_change_percentage_24h: change,
            ..Default::default()
        }
    }

    #[test]
    fn everything_missing_is_neutral_fifty() {
        let s = compute_market_score(None, None, None, &[]);
        assert_eq!(s.score, 50.0);
        assert_eq!(s.label, "Neutral");
    }

    #[test]
    fn trend_is_clamped() {
        let global = GlobalMarket {
            market_cap_change_percentage_24h_usd: Some(-30.0),
            ..Default::default()
        };
        let s = compute_market_score(None, Some(&global), None, &[]);
        assert_eq!(s.components.market_trend, 0.0);
        assert_eq!(s.score, 40.0);
    }

    #[test]
    fn euphoric_market_is_very_bullish() {
        let fg = FearGreedIndex {
            value: 90,
            classification: "Extreme Greed".into(),
            timestamp: String::new(),
            history: Vec::new(),
        };
        let global = GlobalMarket {
            market_cap_change_percentage_24h_usd: Some(6.0),
            ..Default::default()
        };
        let news = NewsSentiment {
            score: 0.4,
            ..NewsSentiment::empty()
        };
        let coins = vec![coin(Some(3.0)), coin(Some(1.0)), coin(Some(-1.0)), coin(Some(5.0))];

        let s = compute_market_score(Some(&fg), Some(&global), Some(&news), &coins);
        // 90*.3 + 80*.2 + 75*.3 + 70*.2 = 79.5
        assert_eq!(s.components.momentum, 75.0);
        assert_eq!(s.score, 79.5);
        assert_eq!(s.label, "Very Bullish");
    }

    #[test]
    fn coins_without_change_count_as_red() {
        let coins = vec![coin(None), coin(Some(2.0))];
        let s = compute_market_score(None, None, None, &coins);
        assert_eq!(s.components.momentum, 50.0);
    }
}
