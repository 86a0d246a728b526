// =============================================================================
// Market Pulse — Main Entry Point
// =============================================================================
//
// Boot order: environment and logging, config, shared state, background
// refresher, then the HTTP API. Ctrl+C stops the server and the refresher.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod cache;
mod config;
mod indicators;
mod pipeline;
mod providers;
mod refresher;
mod signals;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Market Pulse — Starting Up                        ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    // ── 2. Configuration ─────────────────────────────────────────────────
    let config_path = AppConfig::path_from_env();
    let first_run = !config_path.exists();

    let mut config = AppConfig::load_or_default(&config_path)?;
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;

    if first_run {
        // Best-effort: leave an editable copy of the defaults behind.
        match config.save(&config_path) {
            Ok(()) => info!(path = %config_path.display(), "default config written"),
            Err(e) => warn!(error = %e, "Failed to write default config"),
        }
    }

    info!(
        bind_addr = %config.bind_addr,
        refresh_secs = config.refresh_interval_secs,
        top_n = config.top_n_coins,
        signal_coins = config.signal_coins_count,
        "configuration ready"
    );

    // ── 3. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);

    // ── 4. Background refresher ──────────────────────────────────────────
    let refresher = refresher::spawn(state.clone());

    // ── 5. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
            }
            warn!("Shutdown signal received, draining connections");
        })
        .await
        .context("API server failed")?;

    // ── 6. Shutdown ──────────────────────────────────────────────────────
    refresher.abort();

    let stats = state.cache.stats();
    info!(
        cache_entries = stats.total_entries,
        refresh_runs = state.refresh_runs.load(std::sync::atomic::Ordering::Relaxed),
        "Market Pulse shut down complete."
    );
    Ok(())
}
