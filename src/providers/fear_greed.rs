// =============================================================================
// Alternative.me Fear & Greed Index
// =============================================================================

use anyhow::{Context, Result};
use tracing::instrument;

use super::MarketDataClient;
use crate::cache::{keys, Lookup};
use crate::types::{FearGreedIndex, FearGreedPoint};

impl MarketDataClient {
    /// Latest reading plus `limit` days of history (newest first).
    #[instrument(skip(self), name = "fear_greed::index")]
    pub async fn fear_greed(&self, limit: u32) -> Lookup<FearGreedIndex> {
        let url = self.endpoints.fear_greed.clone();
        self.cache
            .get_or_fetch(&keys::fear_greed(limit), self.ttls.fear_greed(), || async {
                let query = [("limit", limit.to_string()), ("format", "json".to_string())];
                let body = self.get_json(&url, &query).await?;
                parse_fear_greed(&body)
            })
            .await
    }
}

/// `{"data": [{"value": "40", "value_classification": "Fear", "timestamp": "..."}]}`
///
/// An empty `data` array is "no usable data" rather than an error.
pub fn parse_fear_greed(body: &serde_json::Value) -> Result<Option<FearGreedIndex>> {
    let entries = body["data"]
        .as_array()
        .context("fear & greed response missing 'data' array")?;

    let history = entries
        .iter()
        .map(parse_point)
        .collect::<Result<Vec<_>>>()?;

    Ok(history.first().cloned().map(|current| FearGreedIndex {
        value: current.value,
        classification: current.classification,
        timestamp: current.timestamp,
        history,
    }))
}

fn parse_point(entry: &serde_json::Value) -> Result<FearGreedPoint> {
    let value = match &entry["value"] {
        serde_json::Value::String(s) => s
            .parse::<u32>()
            .with_context(|| format!("invalid fear & greed value '{s}'"))?,
        other => other
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .context("fear & greed value is not an integer")?,
    };

    Ok(FearGreedPoint {
        value,
        classification: entry["value_classification"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        timestamp: match &entry["timestamp"] {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    })
}
