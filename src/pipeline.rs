// =============================================================================
// Signal Pipeline — cache-backed inputs to one CoinSignal per asset
// =============================================================================
//
// Per coin:
//   1. Indicators from Binance 4h klines (100 bars) when the coin has an
//      exchange symbol and at least 30 bars came back; otherwise CoinGecko
//      daily OHLC over 14 days (no volume, so OBV stays neutral).
//   2. Derivatives snapshot when the coin has a futures symbol.
//   3. Market-wide Fear & Greed and news sentiment, loaded once per request.
//   4. Latest volume-anomaly classification from the detector.
//
// No indicators => `has_data = false` and the neutral fail-soft signal. The
// freshness of every input is reported next to the signal so stale upstream
// data is visible to callers.

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::analysis::VolumeAnomalyDetector;
use crate::cache::{Freshness, Lookup};
use crate::indicators::{self, TechnicalIndicators, MIN_CANDLES};
use crate::providers::MarketDataClient;
use crate::signals::{generate_composite_signal, CompositeSignal, LayerWeights, SignalInputs};
use crate::types::{Candle, CoinMarket, FearGreedIndex, NewsSentiment};

pub const KLINE_INTERVAL: &str = "4h";
pub const KLINE_LIMIT: u32 = 100;
pub const OHLC_FALLBACK_DAYS: u32 = 14;

/// Market-wide inputs shared by every coin in one request.
#[derive(Debug, Clone)]
pub struct MarketContext {
    pub fear_greed: Lookup<FearGreedIndex>,
    pub news: Lookup<NewsSentiment>,
}

impl MarketContext {
    pub async fn load(client: &MarketDataClient) -> Self {
        let (fear_greed, news) = tokio::join!(client.fear_greed(1), client.overall_sentiment());
        Self { fear_greed, news }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputFreshness {
    pub indicators: Freshness,
    pub fear_greed: Freshness,
    pub news: Freshness,
    pub derivatives: Freshness,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoinSignal {
    pub coin_id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub price_change_24h: Option<f64>,
    #[serde(flatten)]
    pub signal: CompositeSignal,
    pub has_data: bool,
    pub indicators: Option<TechnicalIndicators>,
    pub freshness: InputFreshness,
    pub updated_at: String,
}

/// Candles for `coin_id`: exchange klines first, CoinGecko OHLC as fallback.
async fn load_candles(client: &MarketDataClient, coin_id: &str) -> Option<(Vec<Candle>, Freshness)> {
    if let Some(symbol) = client.symbol_for(coin_id) {
        let klines = client.klines(symbol, KLINE_INTERVAL, KLINE_LIMIT).await;
        if let Some(candles) = klines.value().filter(|c| c.len() >= MIN_CANDLES) {
            return Some((candles.to_vec(), klines.freshness()));
        }
        debug!(coin_id, symbol, "klines unusable, falling back to OHLC");
    }

    let ohlc = client.ohlc(coin_id, OHLC_FALLBACK_DAYS).await;
    let candles = ohlc.value().filter(|c| c.len() >= MIN_CANDLES)?;
    Some((candles.to_vec(), ohlc.freshness()))
}

/// Technical indicator bundle for `coin_id` plus the freshness of the
/// candles it was computed from.
pub async fn compute_coin_indicators(
    client: &MarketDataClient,
    coin_id: &str,
) -> Option<(TechnicalIndicators, Freshness)> {
    let (candles, freshness) = load_candles(client, coin_id).await?;
    indicators::compute_all(&candles).map(|bundle| (bundle, freshness))
}

/// Full signal for one coin. `coin` supplies display metadata when the coin
/// is in the current listing.
pub async fn coin_signal(
    client: &MarketDataClient,
    detector: &VolumeAnomalyDetector,
    weights: &LayerWeights,
    context: &MarketContext,
    coin_id: &str,
    coin: Option<&CoinMarket>,
) -> CoinSignal {
    let (indicators, derivatives) = tokio::join!(
        compute_coin_indicators(client, coin_id),
        client.derivatives_snapshot(coin_id),
    );

    let indicator_freshness = indicators
        .as_ref()
        .map_or(Freshness::Missing, |(_, f)| *f);
    let derivatives_freshness = derivatives
        .as_ref()
        .map_or(Freshness::Missing, |(_, f)| *f);

    let freshness = InputFreshness {
        indicators: indicator_freshness,
        fear_greed: context.fear_greed.freshness(),
        news: context.news.freshness(),
        derivatives: derivatives_freshness,
    };

    let (signal, has_data, indicators) = match indicators {
        Some((bundle, _)) => {
            let anomaly = detector.latest(coin_id);
            let inputs = SignalInputs {
                indicators: Some(&bundle),
                volume_anomaly: anomaly.as_ref(),
                fear_greed: context.fear_greed.value().map(|v| v.as_ref()),
                news: context.news.value().map(|v| v.as_ref()),
                derivatives: derivatives.as_ref().map(|(d, _)| d),
            };
            (generate_composite_signal(&inputs, weights), true, Some(bundle))
        }
        None => (CompositeSignal::neutral(), false, None),
    };

    debug!(
        coin_id,
        label = %signal.label,
        score = signal.score,
        has_data,
        "coin signal computed"
    );

    CoinSignal {
        coin_id: coin_id.to_string(),
        symbol: coin.map_or_else(|| coin_id.to_uppercase(), |c| c.symbol.to_uppercase()),
        name: coin.map_or_else(|| coin_id.to_string(), |c| c.name.clone()),
        image: coin.and_then(|c| c.image.clone()),
        current_price: coin.and_then(|c| c.current_price),
        price_change_24h: coin.and_then(CoinMarket::change_24h),
        signal,
        has_data,
        indicators,
        freshness,
        updated_at: Utc::now().to_rfc3339(),
    }
}
