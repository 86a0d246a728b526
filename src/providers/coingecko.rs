// =============================================================================
// CoinGecko — market listing, global stats and OHLC candles
// =============================================================================

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use super::MarketDataClient;
use crate::cache::{keys, Lookup};
use crate::types::{Candle, CoinMarket, GlobalMarket};

impl MarketDataClient {
    /// Top `n` coins by market cap with 1h / 24h / 7d price changes.
    #[instrument(skip(self), name = "coingecko::top_coins")]
    pub async fn top_coins(&self, n: usize) -> Lookup<Vec<CoinMarket>> {
        let url = format!("{}/coins/markets", self.endpoints.coingecko);
        self.cache
            .get_or_fetch(&keys::coingecko_markets(n), self.ttls.market_data(), || async {
                let query = [
                    ("vs_currency", "usd".to_string()),
                    ("order", "market_cap_desc".to_string()),
                    ("per_page", n.to_string()),
                    ("page", "1".to_string()),
                    ("sparkline", "false".to_string()),
                    ("price_change_percentage", "1h,24h,7d".to_string()),
                ];
                let body = self.get_json(&url, &query).await?;
                let coins = parse_markets(body)?;
                debug!(count = coins.len(), "coingecko markets fetched");
                Ok((!coins.is_empty()).then_some(coins))
            })
            .await
    }

    /// Global market data (total cap, volume, dominance, 24h cap change).
    #[instrument(skip(self), name = "coingecko::global")]
    pub async fn global(&self) -> Lookup<GlobalMarket> {
        let url = format!("{}/global", self.endpoints.coingecko);
        self.cache
            .get_or_fetch(&keys::coingecko_global(), self.ttls.global(), || async {
                let body = self.get_json(&url, &[]).await?;
                parse_global(body).map(Some)
            })
            .await
    }

    /// Daily-resolution OHLC candles for `coin_id` over `days`. No volume.
    #[instrument(skip(self), name = "coingecko::ohlc")]
    pub async fn ohlc(&self, coin_id: &str, days: u32) -> Lookup<Vec<Candle>> {
        let url = format!("{}/coins/{}/ohlc", self.endpoints.coingecko, coin_id);
        self.cache
            .get_or_fetch(&keys::coingecko_ohlc(coin_id, days), self.ttls.ohlc(), || async {
                let query = [("vs_currency", "usd".to_string()), ("days", days.to_string())];
                let body = self.get_json(&url, &query).await?;
                let candles = parse_ohlc(&body)?;
                Ok((!candles.is_empty()).then_some(candles))
            })
            .await
    }
}

// =============================================================================
// Response parsing
// =============================================================================

pub fn parse_markets(body: serde_json::Value) -> Result<Vec<CoinMarket>> {
    serde_json::from_value(body).context("markets response is not a coin list")
}

/// `/global` wraps its payload in a `data` object.
pub fn parse_global(mut body: serde_json::Value) -> Result<GlobalMarket> {
    let data = body
        .get_mut("data")
        .map(serde_json::Value::take)
        .context("global response missing 'data'")?;
    serde_json::from_value(data).context("failed to decode global market data")
}

/// `[[timestamp_ms, open, high, low, close], ...]`
pub fn parse_ohlc(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let rows = body.as_array().context("ohlc response is not an array")?;

    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let arr = row.as_array().context("ohlc entry is not an array")?;
        if arr.len() < 5 {
            continue;
        }
        let ts_ms = arr[0].as_f64().context("ohlc timestamp is not a number")?;
        candles.push(Candle {
            time: (ts_ms / 1000.0) as i64,
            open: super::parse_str_f64(&arr[1])?,
            high: super::parse_str_f64(&arr[2])?,
            low: super::parse_str_f64(&arr[3])?,
            close: super::parse_str_f64(&arr[4])?,
            volume: None,
        });
    }
    Ok(candles)
}
