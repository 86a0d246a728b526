// =============================================================================
// CryptoCompare News — headlines with keyword sentiment
// =============================================================================
//
// Article sentiment = (pos - neg) / (pos + neg) over keyword hits in the
// lower-cased title + body, 0.0 when no keyword matches. Each keyword counts
// at most once per article.
//
// Overall sentiment is the mean article score:
//   > 0.2 Bullish   > 0.05 Slightly Bullish   < -0.2 Bearish
//   < -0.05 Slightly Bearish   else Neutral
// Articles above +0.1 count as positive, below -0.1 as negative.

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use super::MarketDataClient;
use crate::cache::{keys, Lookup};
use crate::types::{round_dp, NewsArticle, NewsSentiment};

pub const DEFAULT_CATEGORIES: &str = "BTC,ETH,Trading";
const MAX_ARTICLES: usize = 20;

const POSITIVE_KEYWORDS: &[&str] = &[
    "bullish", "surge", "rally", "gain", "pump", "moon", "breakout", "adoption", "partnership",
    "upgrade", "launch", "approval", "growth", "record", "high", "buy", "accumulate",
    "institutional",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "bearish", "crash", "dump", "plunge", "hack", "exploit", "ban", "regulation", "lawsuit",
    "fraud", "scam", "sell", "liquidation", "fear", "decline", "loss", "warning", "risk",
];

impl MarketDataClient {
    /// Latest articles for `categories`, each scored.
    #[instrument(skip(self), name = "news::crypto_news")]
    pub async fn crypto_news(&self, categories: &str) -> Lookup<Vec<NewsArticle>> {
        let url = format!("{}/data/v2/news/", self.endpoints.cryptocompare);
        self.cache
            .get_or_fetch(&keys::crypto_news(categories), self.ttls.news(), || async {
                let query = [("categories", categories.to_string()), ("lang", "EN".to_string())];
                let body = self.get_json(&url, &query).await?;
                let articles = parse_news(&body)?;
                debug!(count = articles.len(), "news fetched");
                Ok((!articles.is_empty()).then_some(articles))
            })
            .await
    }

    /// Aggregate sentiment over the default news feed. Keeps the freshness
    /// of the underlying article lookup.
    pub async fn overall_sentiment(&self) -> Lookup<NewsSentiment> {
        self.crypto_news(DEFAULT_CATEGORIES)
            .await
            .map(|articles| aggregate_sentiment(articles))
    }
}

pub fn analyze_text_sentiment(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let pos = POSITIVE_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
    let neg = NEGATIVE_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
    let total = pos + neg;
    if total == 0 {
        0.0
    } else {
        (pos as f64 - neg as f64) / total as f64
    }
}

pub fn aggregate_sentiment(articles: &[NewsArticle]) -> NewsSentiment {
    if articles.is_empty() {
        return NewsSentiment::empty();
    }

    let avg = articles.iter().map(|a| a.sentiment).sum::<f64>() / articles.len() as f64;
    let positive = articles.iter().filter(|a| a.sentiment > 0.1).count();
    let negative = articles.iter().filter(|a| a.sentiment < -0.1).count();

    let label = if avg > 0.2 {
        "Bullish"
    } else if avg > 0.05 {
        "Slightly Bullish"
    } else if avg < -0.2 {
        "Bearish"
    } else if avg < -0.05 {
        "Slightly Bearish"
    } else {
        "Neutral"
    };

    NewsSentiment {
        score: round_dp(avg, 3),
        label: label.to_string(),
        article_count: articles.len(),
        positive,
        negative,
        neutral: articles.len() - positive - negative,
    }
}

/// `{"Data": [{"title", "body", "url", "source", "published_on", "imageurl"}]}`
pub fn parse_news(body: &serde_json::Value) -> Result<Vec<NewsArticle>> {
    let data = body["Data"]
        .as_array()
        .context("news response missing 'Data' array")?;

    Ok(data
        .iter()
        .take(MAX_ARTICLES)
        .map(|article| {
            let text = |field: &str| article[field].as_str().unwrap_or_default().to_string();
            let title = text("title");
            let sentiment = analyze_text_sentiment(&format!("{} {}", title, text("body")));
            NewsArticle {
                url: text("url"),
                source: text("source"),
                published_on: article["published_on"].as_i64().unwrap_or(0),
                sentiment: round_dp(sentiment, 3),
                image: text("imageurl"),
                title,
            }
        })
        .collect())
}
