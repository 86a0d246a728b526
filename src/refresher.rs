// =============================================================================
// Periodic Refresher — background cache pre-warm loop
// =============================================================================
//
// Every `refresh_interval_secs` (first tick immediately):
//   - top coins listing (and a volume-anomaly scan over it)
//   - global market data
//   - Fear & Greed with 30 days of history
//   - overall news sentiment
//
// The loop only drives `get_or_fetch`; failures have already been absorbed
// by the cache and show up here as stale or missing lookups, which are
// logged and recorded in the state's error log. The task runs until it is
// aborted on shutdown.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::app_state::{AppState, RefreshReport};
use crate::cache::Freshness;

pub const FEAR_GREED_HISTORY: u32 = 30;

pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = state.config.refresh_interval();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "refresher started");

        loop {
            interval.tick().await;
            refresh_once(&state).await;
        }
    })
}

/// One pre-warm pass over the shared market inputs.
pub async fn refresh_once(state: &AppState) -> RefreshReport {
    let run = state.next_refresh_run();
    let started = Instant::now();
    let market = &state.market;

    let (coins, global, fear_greed, news) = tokio::join!(
        market.top_coins(state.config.top_n_coins),
        market.global(),
        market.fear_greed(FEAR_GREED_HISTORY),
        market.overall_sentiment(),
    );

    let anomalies = coins
        .value()
        .map_or(0, |c| state.volume_detector.scan(c).len());

    let report = RefreshReport {
        run,
        top_coins: coins.freshness(),
        global: global.freshness(),
        fear_greed: fear_greed.freshness(),
        news: news.freshness(),
        anomalies,
        elapsed_ms: started.elapsed().as_millis() as u64,
        at: Utc::now().to_rfc3339(),
    };

    let degraded: Vec<(&str, Freshness)> = [
        ("top_coins", report.top_coins),
        ("global", report.global),
        ("fear_greed", report.fear_greed),
        ("news", report.news),
    ]
    .into_iter()
    .filter(|(_, f)| *f != Freshness::Fresh)
    .collect();

    for (resource, freshness) in &degraded {
        warn!(run, resource, ?freshness, "refresh served degraded data");
        state.push_error(
            format!("refresh run {run}: {resource} is {freshness:?}"),
            Some(resource.to_string()),
        );
    }

    info!(
        run,
        degraded = degraded.len(),
        anomalies,
        elapsed_ms = report.elapsed_ms,
        "refresh complete"
    );

    state.record_refresh(report.clone());
    report
}
