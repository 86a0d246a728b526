// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/`. Every read goes through the shared cache
// via `MarketDataClient`, so a burst of dashboard requests costs at most one
// upstream call per resource and TTL window. Handlers never fail on upstream
// trouble: missing data comes back as nulls, empty lists or a neutral
// signal.
//
// There is no authentication. CORS is permissive so the dashboard can be
// served from anywhere.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::analysis::{compute_market_score, derivatives_summary, MarketScore};
use crate::app_state::{AppState, ErrorRecord, RefreshReport};
use crate::cache::{CacheStats, Freshness, Lookup};
use crate::pipeline::{
    coin_signal, CoinSignal, MarketContext, KLINE_INTERVAL, KLINE_LIMIT, OHLC_FALLBACK_DAYS,
};
use crate::providers::news::DEFAULT_CATEGORIES;
use crate::refresher::FEAR_GREED_HISTORY;
use crate::types::{CoinMarket, FearGreedIndex, NewsArticle, NewsSentiment};

/// Number of articles returned by `/api/sentiment`.
const RECENT_NEWS_LIMIT: usize = 10;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Health ──────────────────────────────────────────────────
        .route("/api/health", get(health))
        // ── Signals ─────────────────────────────────────────────────
        .route("/api/signals", get(signals))
        .route("/api/signals/:coin_id", get(coin_signal_detail))
        // ── Market ──────────────────────────────────────────────────
        .route("/api/market/overview", get(market_overview))
        .route("/api/market/coins", get(market_coins))
        .route("/api/market/movers", get(market_movers))
        .route("/api/ohlc/:coin_id", get(ohlc))
        // ── Analysis ────────────────────────────────────────────────
        .route("/api/volume/anomalies", get(volume_anomalies))
        .route("/api/derivatives/overview", get(derivatives_overview))
        .route("/api/sentiment", get(sentiment))
        // ── Admin ───────────────────────────────────────────────────
        .route("/api/cache/clear", post(clear_cache))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

/// Owned copy of a cached value, for response bodies.
fn owned<T: Clone>(lookup: &Lookup<T>) -> Option<T> {
    lookup.value().map(|v| T::clone(v))
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    cache: CacheStats,
    refresh_runs: u64,
    last_refresh: Option<RefreshReport>,
    recent_errors: Vec<ErrorRecord>,
    timestamp: String,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let last_refresh = state.last_refresh.read().clone();
    // The coin listing drives every other view; without it the dashboard is
    // effectively empty.
    let status = match &last_refresh {
        Some(report) if report.top_coins == Freshness::Missing => "degraded",
        _ => "ok",
    };

    Json(HealthResponse {
        status,
        uptime_secs: state.uptime_secs(),
        cache: state.cache.stats(),
        refresh_runs: state
            .refresh_runs
            .load(std::sync::atomic::Ordering::Relaxed),
        last_refresh,
        recent_errors: state.recent_errors.read().clone(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

// =============================================================================
// Signals
// =============================================================================

async fn signals(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let market = &state.market;
    let (listing, context) = tokio::join!(
        market.top_coins(state.config.top_n_coins),
        MarketContext::load(market),
    );

    let coins: &[CoinMarket] = listing.value().map(|c| c.as_slice()).unwrap_or_default();
    let weights = &state.config.layer_weights;

    let results: Vec<CoinSignal> = join_all(
        coins
            .iter()
            .take(state.config.signal_coins_count)
            .map(|coin| {
                coin_signal(
                    market,
                    &state.volume_detector,
                    weights,
                    &context,
                    &coin.id,
                    Some(coin),
                )
            }),
    )
    .await;

    Json(results)
}

async fn coin_signal_detail(
    State(state): State<Arc<AppState>>,
    Path(coin_id): Path<String>,
) -> impl IntoResponse {
    let market = &state.market;
    let (listing, context) = tokio::join!(
        market.top_coins(state.config.top_n_coins),
        MarketContext::load(market),
    );

    let coin = listing
        .value()
        .and_then(|coins| coins.iter().find(|c| c.id == coin_id));

    let signal = coin_signal(
        market,
        &state.volume_detector,
        &state.config.layer_weights,
        &context,
        &coin_id,
        coin,
    )
    .await;

    Json(signal)
}

// =============================================================================
// Market
// =============================================================================

#[derive(Serialize)]
struct MarketOverview {
    total_market_cap_usd: Option<f64>,
    total_volume_usd: Option<f64>,
    btc_dominance: Option<f64>,
    market_cap_change_24h: Option<f64>,
    active_cryptocurrencies: Option<u64>,
    fear_greed: Option<FearGreedIndex>,
    market_score: MarketScore,
    news_sentiment: Option<NewsSentiment>,
}

async fn market_overview(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let market = &state.market;
    let (global, fear_greed, news, listing) = tokio::join!(
        market.global(),
        market.fear_greed(FEAR_GREED_HISTORY),
        market.overall_sentiment(),
        market.top_coins(state.config.top_n_coins),
    );

    let global_data = global.value();
    let market_score = compute_market_score(
        fear_greed.value().map(Arc::as_ref),
        global_data.map(Arc::as_ref),
        news.value().map(Arc::as_ref),
        listing.value().map(|c| c.as_slice()).unwrap_or_default(),
    );

    Json(MarketOverview {
        total_market_cap_usd: global_data.and_then(|g| g.total_market_cap.get("usd").copied()),
        total_volume_usd: global_data.and_then(|g| g.total_volume.get("usd").copied()),
        btc_dominance: global_data.and_then(|g| g.market_cap_percentage.get("btc").copied()),
        market_cap_change_24h: global_data.and_then(|g| g.market_cap_change_percentage_24h_usd),
        active_cryptocurrencies: global_data.and_then(|g| g.active_cryptocurrencies),
        fear_greed: owned(&fear_greed),
        market_score,
        news_sentiment: owned(&news),
    })
}

async fn market_coins(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let listing = state.market.top_coins(state.config.top_n_coins).await;
    Json(owned(&listing).unwrap_or_default())
}

#[derive(Serialize)]
struct Movers {
    gainers: Vec<CoinMarket>,
    losers: Vec<CoinMarket>,
}

/// Coins ordered by 24h change, strongest first. Coins without a change
/// figure are left out. With fewer than `2 * count` coins the two lists
/// overlap.
fn top_movers(coins: &[CoinMarket], count: usize) -> Movers {
    let mut ranked: Vec<(f64, &CoinMarket)> = coins
        .iter()
        .filter_map(|c| c.change_24h().map(|change| (change, c)))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let gainers = ranked.iter().take(count).map(|(_, c)| (*c).clone()).collect();
    let losers = ranked.iter().rev().take(count).map(|(_, c)| (*c).clone()).collect();

    Movers { gainers, losers }
}

async fn market_movers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let listing = state.market.top_coins(state.config.top_n_coins).await;
    let coins = listing.value().map(|c| c.as_slice()).unwrap_or_default();
    Json(top_movers(coins, state.config.top_movers_count))
}

#[derive(Debug, Deserialize)]
struct OhlcQuery {
    #[serde(default = "default_ohlc_days")]
    days: u32,
}

fn default_ohlc_days() -> u32 {
    OHLC_FALLBACK_DAYS
}

/// Chart candles: exchange klines when the coin trades on Binance, CoinGecko
/// OHLC over `days` otherwise.
async fn ohlc(
    State(state): State<Arc<AppState>>,
    Path(coin_id): Path<String>,
    Query(query): Query<OhlcQuery>,
) -> impl IntoResponse {
    let market = &state.market;

    if let Some(symbol) = market.symbol_for(&coin_id) {
        let klines = market.klines(symbol, KLINE_INTERVAL, KLINE_LIMIT).await;
        if let Some(candles) = owned(&klines).filter(|c| !c.is_empty()) {
            return Json(candles);
        }
    }

    let candles = market.ohlc(&coin_id, query.days).await;
    Json(owned(&candles).unwrap_or_default())
}

// =============================================================================
// Analysis
// =============================================================================

async fn volume_anomalies(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let listing = state.market.top_coins(state.config.top_n_coins).await;
    let reports = listing
        .value()
        .map(|coins| state.volume_detector.scan(coins))
        .unwrap_or_default();
    Json(reports)
}

async fn derivatives_overview(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let coin_ids = state.config.derivatives_coin_ids();
    let snapshots = state.market.top_derivatives(&coin_ids).await;
    Json(derivatives_summary(&snapshots))
}

#[derive(Serialize)]
struct SentimentResponse {
    overall: Option<NewsSentiment>,
    fear_greed: Option<FearGreedIndex>,
    recent_news: Vec<NewsArticle>,
}

async fn sentiment(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let market = &state.market;
    let (news, fear_greed) = tokio::join!(
        market.crypto_news(DEFAULT_CATEGORIES),
        market.fear_greed(FEAR_GREED_HISTORY),
    );
    // Served from the cache entry the news fetch above just populated.
    let overall = market.overall_sentiment().await;

    let recent_news = news
        .value()
        .map(|articles| articles.iter().take(RECENT_NEWS_LIMIT).cloned().collect())
        .unwrap_or_default();

    Json(SentimentResponse {
        overall: owned(&overall),
        fear_greed: owned(&fear_greed),
        recent_news,
    })
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Serialize)]
struct ClearResponse {
    cleared: usize,
    message: String,
}

async fn clear_cache(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.cache.stats().total_entries;
    state.cache.clear();
    info!(cleared, "cache cleared via API");

    Json(ClearResponse {
        cleared,
        message: format!("Cleared {cleared} cache entries"),
    })
}
