// =============================================================================
// Binance — spot klines and USD-M futures positioning data
// =============================================================================
//
// Spot klines use `{SYMBOL}USDT`. The derivatives snapshot joins three
// futures endpoints:
//   funding rate       latest = last element of the history
//   open interest      single object
//   long/short ratio   latest = first element
//
// Each endpoint is cached independently, so one failing endpoint degrades
// only its own field of the snapshot.

use anyhow::{Context, Result};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{parse_str_f64, MarketDataClient};
use crate::cache::{keys, Freshness, Lookup};
use crate::types::{Candle, DerivativesSnapshot};

const FUNDING_HISTORY_LIMIT: u32 = 30;
const LONG_SHORT_LIMIT: u32 = 10;
const LONG_SHORT_PERIOD: &str = "1h";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRatePoint {
    pub funding_rate: f64,
    pub funding_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongShortPoint {
    pub long_short_ratio: f64,
    pub long_account: Option<f64>,
    pub short_account: Option<f64>,
    pub timestamp: i64,
}

fn pair(symbol: &str) -> String {
    format!("{symbol}USDT")
}

impl MarketDataClient {
    /// GET /klines for `{symbol}USDT`.
    #[instrument(skip(self), name = "binance::klines")]
    pub async fn klines(&self, symbol: &str, interval: &str, limit: u32) -> Lookup<Vec<Candle>> {
        let url = format!("{}/klines", self.endpoints.binance_spot);
        let key = keys::binance_klines(symbol, interval, limit);
        self.cache
            .get_or_fetch(&key, self.ttls.ohlc(), || async {
                let query = [
                    ("symbol", pair(symbol)),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ];
                let body = self.get_json(&url, &query).await?;
                let candles = parse_klines(&body)?;
                debug!(symbol, interval, count = candles.len(), "klines fetched");
                Ok((!candles.is_empty()).then_some(candles))
            })
            .await
    }

    /// GET /fapi/v1/fundingRate history, oldest first.
    #[instrument(skip(self), name = "binance::funding_rates")]
    pub async fn funding_rates(&self, symbol: &str) -> Lookup<Vec<FundingRatePoint>> {
        let url = format!("{}/fapi/v1/fundingRate", self.endpoints.binance_futures);
        self.cache
            .get_or_fetch(&keys::binance_funding(symbol), self.ttls.derivatives(), || async {
                let query = [
                    ("symbol", pair(symbol)),
                    ("limit", FUNDING_HISTORY_LIMIT.to_string()),
                ];
                let body = self.get_json(&url, &query).await?;
                let points = parse_funding_rates(&body)?;
                Ok((!points.is_empty()).then_some(points))
            })
            .await
    }

    /// GET /fapi/v1/openInterest, in contracts.
    #[instrument(skip(self), name = "binance::open_interest")]
    pub async fn open_interest(&self, symbol: &str) -> Lookup<f64> {
        let url = format!("{}/fapi/v1/openInterest", self.endpoints.binance_futures);
        self.cache
            .get_or_fetch(&keys::binance_open_interest(symbol), self.ttls.derivatives(), || async {
                let body = self.get_json(&url, &[("symbol", pair(symbol))]).await?;
                parse_open_interest(&body).map(Some)
            })
            .await
    }

    /// GET /futures/data/globalLongShortAccountRatio, newest first.
    #[instrument(skip(self), name = "binance::long_short_ratio")]
    pub async fn long_short_ratio(&self, symbol: &str, period: &str) -> Lookup<Vec<LongShortPoint>> {
        let url = format!(
            "{}/futures/data/globalLongShortAccountRatio",
            self.endpoints.binance_futures
        );
        let key = keys::binance_long_short(symbol, period);
        self.cache
            .get_or_fetch(&key, self.ttls.derivatives(), || async {
                let query = [
                    ("symbol", pair(symbol)),
                    ("period", period.to_string()),
                    ("limit", LONG_SHORT_LIMIT.to_string()),
                ];
                let body = self.get_json(&url, &query).await?;
                let points = parse_long_short(&body)?;
                Ok((!points.is_empty()).then_some(points))
            })
            .await
    }

    /// Funding, open interest and long/short ratio for one coin.
    ///
    /// Returns `None` for coins without a futures symbol. The freshness is
    /// the combination of the three underlying lookups; if all three are
    /// missing the snapshot is `None` as well.
    pub async fn derivatives_snapshot(
        &self,
        coin_id: &str,
    ) -> Option<(DerivativesSnapshot, Freshness)> {
        let symbol = self.symbol_for(coin_id)?.to_string();

        let (funding, oi, ls) = tokio::join!(
            self.funding_rates(&symbol),
            self.open_interest(&symbol),
            self.long_short_ratio(&symbol, LONG_SHORT_PERIOD),
        );

        let freshness =
            Freshness::combine(&[funding.freshness(), oi.freshness(), ls.freshness()]);
        if freshness == Freshness::Missing {
            warn!(coin_id, symbol = %symbol, "no derivatives data available");
            return None;
        }

        let snapshot = DerivativesSnapshot {
            coin_id: coin_id.to_string(),
            funding_rate: funding.value().and_then(|p| p.last()).map(|p| p.funding_rate),
            open_interest: oi.value().map(|v| **v),
            long_short_ratio: ls.value().and_then(|p| p.first()).map(|p| p.long_short_ratio),
            symbol,
        };
        Some((snapshot, freshness))
    }

    /// Snapshots for every mapped coin in `coin_ids`, in input order. Coins
    /// without a futures symbol or without any data are skipped.
    pub async fn top_derivatives(&self, coin_ids: &[String]) -> Vec<DerivativesSnapshot> {
        join_all(coin_ids.iter().map(|id| self.derivatives_snapshot(id)))
            .await
            .into_iter()
            .flatten()
            .map(|(snapshot, _)| snapshot)
            .collect()
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Binance kline arrays:
///   [0] openTime (ms), [1] open, [2] high, [3] low, [4] close, [5] volume, ...
pub fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;
        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }
        let open_time = arr[0].as_i64().unwrap_or(0);
        candles.push(Candle {
            time: open_time / 1000,
            open: parse_str_f64(&arr[1])?,
            high: parse_str_f64(&arr[2])?,
            low: parse_str_f64(&arr[3])?,
            close: parse_str_f64(&arr[4])?,
            volume: Some(parse_str_f64(&arr[5])?),
        });
    }
    Ok(candles)
}

pub fn parse_funding_rates(body: &serde_json::Value) -> Result<Vec<FundingRatePoint>> {
    let arr = body
        .as_array()
        .context("funding rate response is not an array")?;
    arr.iter()
        .map(|entry| -> Result<FundingRatePoint> {
            Ok(FundingRatePoint {
                funding_rate: parse_str_f64(&entry["fundingRate"])
                    .context("invalid fundingRate")?,
                funding_time: entry["fundingTime"].as_i64().unwrap_or(0),
            })
        })
        .collect()
}

pub fn parse_open_interest(body: &serde_json::Value) -> Result<f64> {
    parse_str_f64(&body["openInterest"]).context("invalid openInterest")
}

pub fn parse_long_short(body: &serde_json::Value) -> Result<Vec<LongShortPoint>> {
    let arr = body
        .as_array()
        .context("long/short response is not an array")?;
    arr.iter()
        .map(|entry| -> Result<LongShortPoint> {
            Ok(LongShortPoint {
                long_short_ratio: parse_str_f64(&entry["longShortRatio"])
                    .context("invalid longShortRatio")?,
                long_account: parse_str_f64(&entry["longAccount"]).ok(),
                short_account: parse_str_f64(&entry["shortAccount"]).ok(),
                timestamp: entry["timestamp"].as_i64().unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::{AppConfig, ProviderEndpoints};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn offline_client() -> MarketDataClient {
        let config = AppConfig {
            endpoints: ProviderEndpoints::all_at("http://127.0.0.1:9"),
            http_timeout_secs: 2,
            ..AppConfig::default()
        };
        MarketDataClient::new(&config, Arc::new(MemoryCache::new())).unwrap()
    }

    #[test]
    fn klines_parse_with_volume() {
        let body = json!([
            [1_700_000_000_000_i64, "100.0", "110.0", "95.0", "105.0", "12.5", 1_700_014_399_999_i64],
            [1_700_014_400_000_i64, "105.0", "108.0", "101.0", "102.0", "8.0", 1_700_028_799_999_i64],
            [1_700_028_800_000_i64, "1"]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, 1_700_000_000);
        assert_eq!(candles[0].volume, Some(12.5));
        assert_eq!(candles[1].close, 102.0);
    }

    #[test]
    fn funding_and_ratio_parse() {
        let funding = parse_funding_rates(&json!([
            { "symbol": "BTCUSDT", "fundingRate": "0.00010000", "fundingTime": 1 },
            { "symbol": "BTCUSDT", "fundingRate": "0.00150000", "fundingTime": 2 }
        ]))
        .unwrap();
        assert_eq!(funding.last().map(|p| p.funding_rate), Some(0.0015));

        let ls = parse_long_short(&json!([
            { "longShortRatio": "2.1500", "longAccount": "0.6825", "shortAccount": "0.3175", "timestamp": 5 }
        ]))
        .unwrap();
        assert_eq!(ls[0].long_short_ratio, 2.15);
        assert_eq!(ls[0].long_account, Some(0.6825));

        assert_eq!(parse_open_interest(&json!({ "openInterest": "81234.5" })).unwrap(), 81234.5);
        assert!(parse_open_interest(&json!({ "code": -1121 })).is_err());
    }

    #[tokio::test]
    async fn snapshot_is_assembled_from_cached_endpoints() {
        let client = offline_client();
        let cache = client.cache();
        let ttl = Duration::from_secs(300);
        cache.set(
            &keys::binance_funding("BTC"),
            vec![
                FundingRatePoint { funding_rate: 0.0001, funding_time: 1 },
                FundingRatePoint { funding_rate: 0.0012, funding_time: 2 },
            ],
            ttl,
        );
        cache.set(&keys::binance_open_interest("BTC"), 90_000.0_f64, ttl);
        cache.set(
            &keys::binance_long_short("BTC", LONG_SHORT_PERIOD),
            vec![LongShortPoint {
                long_short_ratio: 0.4,
                long_account: None,
                short_account: None,
                timestamp: 0,
            }],
            ttl,
        );

        let (snapshot, freshness) = client.derivatives_snapshot("bitcoin").await.unwrap();
        assert_eq!(freshness, Freshness::Fresh);
        assert_eq!(snapshot.symbol, "BTC");
        assert_eq!(snapshot.funding_rate, Some(0.0012));
        assert_eq!(snapshot.open_interest, Some(90_000.0));
        assert_eq!(snapshot.long_short_ratio, Some(0.4));
    }

    #[tokio::test]
    async fn unmapped_or_unreachable_coins_have_no_snapshot() {
        let client = offline_client();
        assert!(client.derivatives_snapshot("not-a-listed-coin").await.is_none());
        // Every endpoint fails against the closed port.
        assert!(client.derivatives_snapshot("ethereum").await.is_none());
        assert!(client
            .top_derivatives(&["ethereum".to_string(), "nope".to_string()])
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn partial_data_is_reported_stale() {
        let client = offline_client();
        client
            .cache()
            .set(&keys::binance_open_interest("SOL"), 1_000.0_f64, Duration::from_secs(300));

        let (snapshot, freshness) = client.derivatives_snapshot("solana").await.unwrap();
        assert_eq!(freshness, Freshness::Stale);
        assert_eq!(snapshot.open_interest, Some(1_000.0));
        assert_eq!(snapshot.funding_rate, None);
    }
}
