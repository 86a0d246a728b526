// =============================================================================
// Central Application State
// =============================================================================
//
// Constructed once in `main` and shared with the HTTP handlers and the
// refresher via `Arc<AppState>`. There is no process-wide cache instance: the
// cache is built here and handed to the provider client explicitly, so tests
// can build isolated states.
//
// Thread safety:
//   - Atomic counters for refresh bookkeeping.
//   - parking_lot::RwLock for the error log and last refresh report.
//   - The cache and the anomaly detector manage their own interior
//     mutability.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::analysis::VolumeAnomalyDetector;
use crate::cache::{Freshness, MemoryCache};
use crate::config::AppConfig;
use crate::providers::MarketDataClient;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded upstream problem for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Cache key or resource the problem relates to.
    pub resource: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Outcome of one refresher pass.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub run: u64,
    pub top_coins: Freshness,
    pub global: Freshness,
    pub fear_greed: Freshness,
    pub news: Freshness,
    pub anomalies: usize,
    pub elapsed_ms: u64,
    pub at: String,
}

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<MemoryCache>,
    pub market: MarketDataClient,
    pub volume_detector: Arc<VolumeAnomalyDetector>,

    // ── Refresh bookkeeping ─────────────────────────────────────────────
    pub refresh_runs: AtomicU64,
    pub last_refresh: RwLock<Option<RefreshReport>>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Used for uptime in the health payload.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build the state with a fresh, empty cache.
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_cache(config, Arc::new(MemoryCache::new()))
    }

    /// Build the state around an existing cache.
    pub fn with_cache(config: AppConfig, cache: Arc<MemoryCache>) -> Result<Self> {
        let market = MarketDataClient::new(&config, cache.clone())?;
        Ok(Self {
            config: Arc::new(config),
            cache,
            market,
            volume_detector: Arc::new(VolumeAnomalyDetector::new()),
            refresh_runs: AtomicU64::new(0),
            last_refresh: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        })
    }

    // ── Refresh bookkeeping ─────────────────────────────────────────────

    /// Returns the 1-based number of the run being started.
    pub fn next_refresh_run(&self) -> u64 {
        self.refresh_runs.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_refresh(&self, report: RefreshReport) {
        *self.last_refresh.write() = Some(report);
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record a problem. The log is capped at [`MAX_RECENT_ERRORS`]; oldest
    /// entries are evicted first.
    pub fn push_error(&self, message: String, resource: Option<String>) {
        let record = ErrorRecord {
            message,
            resource,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
