// =============================================================================
// Market Data Providers — cache-backed clients for the upstream APIs
// =============================================================================
//
// One `MarketDataClient` owns the HTTP client, the shared cache and the
// provider settings. Each provider lives in its own file as an `impl` block:
// - coingecko: market listing, global stats, OHLC
// - binance: spot klines, futures funding / open interest / long-short
// - fear_greed: Alternative.me Fear & Greed index
// - news: CryptoCompare headlines with keyword sentiment
//
// Every public call goes through `MemoryCache::get_or_fetch` and returns a
// `Lookup`, so upstream failures surface as stale or absent data, never as
// an error. Response parsing is done by pure functions that the tests cover
// without network access.
// =============================================================================

pub mod binance;
pub mod coingecko;
pub mod fear_greed;
pub mod news;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cache::MemoryCache;
use crate::config::{AppConfig, CacheTtls, ProviderEndpoints, SymbolMapping};

/// Shared, cheaply clonable handle to every upstream provider.
#[derive(Clone)]
pub struct MarketDataClient {
    http: reqwest::Client,
    cache: Arc<MemoryCache>,
    endpoints: ProviderEndpoints,
    ttls: CacheTtls,
    symbol_map: Arc<Vec<SymbolMapping>>,
}

impl MarketDataClient {
    pub fn new(config: &AppConfig, cache: Arc<MemoryCache>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("failed to build reqwest client for MarketDataClient")?;

        debug!(
            coingecko = %config.endpoints.coingecko,
            binance = %config.endpoints.binance_spot,
            "MarketDataClient initialised"
        );

        Ok(Self {
            http,
            cache,
            endpoints: config.endpoints.clone(),
            ttls: config.cache_ttls,
            symbol_map: Arc::new(config.symbol_map.clone()),
        })
    }

    #[cfg(test)]
    pub fn cache(&self) -> &Arc<MemoryCache> {
        &self.cache
    }

    /// Exchange base symbol for a CoinGecko id (`bitcoin` => `BTC`).
    pub fn symbol_for(&self, coin_id: &str) -> Option<&str> {
        self.symbol_map
            .iter()
            .find(|m| m.coin_id == coin_id)
            .map(|m| m.symbol.as_str())
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// GET `url` with `query` and decode the JSON body. Non-2xx responses are
    /// errors carrying the status and body.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("GET {url} returned {status}: {body}");
        }

        resp.json()
            .await
            .with_context(|| format!("failed to parse response from {url}"))
    }
}

impl std::fmt::Debug for MarketDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataClient")
            .field("endpoints", &self.endpoints)
            .field("symbols", &self.symbol_map.len())
            .finish()
    }
}

/// Parse a JSON value that may be either a string or a number into `f64`.
pub(crate) fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}
