// =============================================================================
// Configuration — service settings loaded from JSON with atomic save
// =============================================================================
//
// Every tunable lives here: bind address, refresh cadence, provider base URLs,
// per-resource cache TTLs, composite layer weights and the CoinGecko id to
// exchange symbol map.
//
// All fields carry `#[serde(default)]` so a partial file (or `{}`) loads with
// the remaining values defaulted. Persistence uses an atomic tmp + rename.
//
// `validate()` runs once at startup; a failure is fatal.
//
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::signals::LayerWeights;

pub const DEFAULT_CONFIG_PATH: &str = "market_pulse.json";
pub const CONFIG_PATH_ENV: &str = "MARKET_PULSE_CONFIG";
pub const BIND_ADDR_ENV: &str = "MARKET_PULSE_BIND_ADDR";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    120
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_top_n_coins() -> usize {
    100
}

fn default_signal_coins_count() -> usize {
    15
}

fn default_top_movers_count() -> usize {
    10
}

fn default_derivatives_coins_count() -> usize {
    15
}

fn default_symbol_map() -> Vec<SymbolMapping> {
    [
        ("bitcoin", "BTC"),
        ("ethereum", "ETH"),
        ("binancecoin", "BNB"),
        ("solana", "SOL"),
        ("ripple", "XRP"),
        ("cardano", "ADA"),
        ("dogecoin", "DOGE"),
        ("avalanche-2", "AVAX"),
        ("polkadot", "DOT"),
        ("chainlink", "LINK"),
        ("tron", "TRX"),
        ("polygon-ecosystem-token", "POL"),
        ("shiba-inu", "SHIB"),
        ("litecoin", "LTC"),
        ("bitcoin-cash", "BCH"),
        ("uniswap", "UNI"),
        ("stellar", "XLM"),
        ("near", "NEAR"),
        ("internet-computer", "ICP"),
        ("aptos", "APT"),
        ("filecoin", "FIL"),
        ("cosmos", "ATOM"),
        ("arbitrum", "ARB"),
        ("optimism", "OP"),
        ("sui", "SUI"),
        ("render-token", "RENDER"),
        ("injective-protocol", "INJ"),
        ("the-graph", "GRT"),
        ("hedera-hashgraph", "HBAR"),
        ("aave", "AAVE"),
    ]
    .into_iter()
    .map(|(coin_id, symbol)| SymbolMapping {
        coin_id: coin_id.to_string(),
        symbol: symbol.to_string(),
    })
    .collect()
}

// =============================================================================
// ProviderEndpoints
// =============================================================================

/// Base URLs of the upstream data providers. Overridable so tests can point
/// them at a closed local port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub coingecko: String,
    pub binance_spot: String,
    pub binance_futures: String,
    pub fear_greed: String,
    pub cryptocompare: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            coingecko: "https://api.coingecko.com/api/v3".to_string(),
            binance_spot: "https://api.binance.com/api/v3".to_string(),
            binance_futures: "https://fapi.binance.com".to_string(),
            fear_greed: "https://api.alternative.me/fng/".to_string(),
            cryptocompare: "https://min-api.cryptocompare.com".to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Every endpoint rooted at `base`, for offline test runs.
    #[cfg(test)]
    pub fn all_at(base: &str) -> Self {
        Self {
            coingecko: base.to_string(),
            binance_spot: base.to_string(),
            binance_futures: base.to_string(),
            fear_greed: base.to_string(),
            cryptocompare: base.to_string(),
        }
    }
}

// =============================================================================
// CacheTtls
// =============================================================================

/// Per-resource cache TTLs in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    pub market_data_secs: u64,
    pub ohlc_secs: u64,
    pub global_secs: u64,
    pub fear_greed_secs: u64,
    pub derivatives_secs: u64,
    pub news_secs: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            market_data_secs: 120,
            ohlc_secs: 300,
            global_secs: 120,
            fear_greed_secs: 3600,
            derivatives_secs: 300,
            news_secs: 900,
        }
    }
}

impl CacheTtls {
    pub fn market_data(&self) -> Duration {
        Duration::from_secs(self.market_data_secs)
    }

    pub fn ohlc(&self) -> Duration {
        Duration::from_secs(self.ohlc_secs)
    }

    pub fn global(&self) -> Duration {
        Duration::from_secs(self.global_secs)
    }

    pub fn fear_greed(&self) -> Duration {
        Duration::from_secs(self.fear_greed_secs)
    }

    pub fn derivatives(&self) -> Duration {
        Duration::from_secs(self.derivatives_secs)
    }

    pub fn news(&self) -> Duration {
        Duration::from_secs(self.news_secs)
    }
}

/// CoinGecko id => exchange base symbol (`bitcoin` => `BTC`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMapping {
    pub coin_id: String,
    pub symbol: String,
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // --- Server --------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Period of the background cache pre-warm loop.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Per-request timeout for upstream HTTP calls.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    // --- Listing sizes -------------------------------------------------------

    /// Coins requested from the market listing.
    #[serde(default = "default_top_n_coins")]
    pub top_n_coins: usize,

    /// Leading coins of the listing that get a composite signal.
    #[serde(default = "default_signal_coins_count")]
    pub signal_coins_count: usize,

    /// Gainers / losers reported by the movers endpoint.
    #[serde(default = "default_top_movers_count")]
    pub top_movers_count: usize,

    /// Leading entries of `symbol_map` covered by the derivatives overview.
    #[serde(default = "default_derivatives_coins_count")]
    pub derivatives_coins_count: usize,

    // --- Providers, caching, scoring ----------------------------------------

    #[serde(default)]
    pub endpoints: ProviderEndpoints,

    #[serde(default)]
    pub cache_ttls: CacheTtls,

    #[serde(default)]
    pub layer_weights: LayerWeights,

    /// Ordered; the derivatives overview walks it front to back.
    #[serde(default = "default_symbol_map")]
    pub symbol_map: Vec<SymbolMapping>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            refresh_interval_secs: default_refresh_interval_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            top_n_coins: default_top_n_coins(),
            signal_coins_count: default_signal_coins_count(),
            top_movers_count: default_top_movers_count(),
            derivatives_coins_count: default_derivatives_coins_count(),
            endpoints: ProviderEndpoints::default(),
            cache_ttls: CacheTtls::default(),
            layer_weights: LayerWeights::default(),
            symbol_map: default_symbol_map(),
        }
    }
}

impl AppConfig {
    /// Config file path: `$MARKET_PULSE_CONFIG` or `market_pulse.json`.
    pub fn path_from_env() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            symbols = config.symbol_map.len(),
            "config loaded"
        );

        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults with a
    /// warning. A file that exists but fails to parse is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply environment overrides (`MARKET_PULSE_BIND_ADDR`).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var(BIND_ADDR_ENV) {
            if !addr.trim().is_empty() {
                info!(bind_addr = %addr, "bind address overridden from environment");
                self.bind_addr = addr;
            }
        }
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "config saved (atomic)");
        Ok(())
    }

    /// Startup checks. Any error here aborts the process.
    pub fn validate(&self) -> Result<()> {
        self.layer_weights
            .validate()
            .context("invalid layer weights")?;

        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be greater than zero");
        }
        if self.http_timeout_secs == 0 {
            bail!("http_timeout_secs must be greater than zero");
        }
        if self.top_n_coins == 0 || self.signal_coins_count == 0 || self.top_movers_count == 0 {
            bail!("coin counts must be greater than zero");
        }
        if self.signal_coins_count > self.top_n_coins {
            bail!(
                "signal_coins_count ({}) exceeds top_n_coins ({})",
                self.signal_coins_count,
                self.top_n_coins
            );
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// The first `derivatives_coins_count` mapped coin ids.
    pub fn derivatives_coin_ids(&self) -> Vec<String> {
        self.symbol_map
            .iter()
            .take(self.derivatives_coins_count)
            .map(|m| m.coin_id.clone())
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000");
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(120));
        assert_eq!(cfg.top_n_coins, 100);
        assert_eq!(cfg.signal_coins_count, 15);
        assert_eq!(cfg.symbol_map.len(), 30);
        assert_eq!(cfg.symbol_map[0].symbol, "BTC");
        assert_eq!(cfg.symbol_map[29].coin_id, "aave");
        assert_eq!(cfg.cache_ttls.fear_greed(), Duration::from_secs(3600));
        assert_eq!(cfg.cache_ttls.news(), Duration::from_secs(900));
        cfg.validate().unwrap();
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.top_movers_count, 10);
        assert_eq!(cfg.layer_weights, LayerWeights::default());
        assert_eq!(cfg.endpoints, ProviderEndpoints::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{
            "bind_addr": "127.0.0.1:9000",
            "cache_ttls": { "news_secs": 60 },
            "layer_weights": { "technical": 0.55, "volume": 0.10 }
        }"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.cache_ttls.news_secs, 60);
        assert_eq!(cfg.cache_ttls.ohlc_secs, 300);
        assert_eq!(cfg.layer_weights.sentiment, 0.20);
        cfg.validate().unwrap();
    }

    #[test]
    fn bad_weights_are_fatal() {
        let json = r#"{ "layer_weights": { "technical": 0.9 } }"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("layer weights"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = AppConfig {
            refresh_interval_secs: 0,
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn derivatives_slice_follows_map_order() {
        let cfg = AppConfig::default();

        let ids = cfg.derivatives_coin_ids();
        assert_eq!(ids.len(), 15);
        assert_eq!(ids[0], "bitcoin");
        assert_eq!(ids[14], "bitcoin-cash");
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("market_pulse_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("market_pulse.json");

        let mut cfg = AppConfig::default();
        cfg.top_movers_count = 4;
        cfg.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.top_movers_count, 4);
        assert_eq!(loaded.symbol_map, cfg.symbol_map);
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = AppConfig::load_or_default("/definitely/not/here/market_pulse.json").unwrap();
        assert_eq!(cfg.bind_addr, default_bind_addr());
    }
}
