// =============================================================================
// Sentiment Layer Scorer — contrarian Fear & Greed plus news tone
// =============================================================================
//
// Fear & Greed:  <=15 => +1.0   <=25 => +0.5   >=85 => -1.0   >=75 => -0.5
//                otherwise 0.0 (fear is a buy signal, greed a sell signal)
// News:          clamp(score * 3, -1, 1)
//
// Layer score = mean of whichever inputs are present. A non-finite news
// score is treated as missing.

use super::mean;
use crate::types::{FearGreedIndex, NewsSentiment};

const NEWS_AMPLIFICATION: f64 = 3.0;

pub fn sentiment_score(
    fear_greed: Option<&FearGreedIndex>,
    news: Option<&NewsSentiment>,
) -> f64 {
    let mut scores = Vec::with_capacity(2);

    if let Some(fg) = fear_greed {
        scores.push(fear_greed_score(fg.value));
    }

    if let Some(news) = news.filter(|n| n.score.is_finite()) {
        scores.push((news.score * NEWS_AMPLIFICATION).clamp(-1.0, 1.0));
    }

    mean(&scores)
}

fn fear_greed_score(value: u32) -> f64 {
    if value <= 15 {
        1.0
    } else if value <= 25 {
        0.5
    } else if value >= 85 {
        -1.0
    } else if value >= 75 {
        -0.5
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fg(value: u32) -> FearGreedIndex {
        FearGreedIndex {
            value,
            classification: String::new(),
            timestamp: String::new(),
            history: Vec::new(),
        }
    }

    fn news(score: f64) -> NewsSentiment {
        NewsSentiment {
            score,
            ..NewsSentiment::empty()
        }
    }

    #[test]
    fn nothing_present_is_neutral() {
        assert_eq!(sentiment_score(None, None), 0.0);
    }

    #[test]
    fn fear_greed_buckets() {
        let cases = [(0, 1.0), (10, 1.0), (15, 1.0), (16, 0.5), (25, 0.5), (26, 0.0),
            (74, 0.0), (75, -0.5), (84, -0.5), (85, -1.0), (100, -1.0)];
        for (value, expected) in cases {
            assert_eq!(sentiment_score(Some(&fg(value)), None), expected, "F&G {value}");
        }
    }

    #[test]
    fn news_is_amplified_and_clamped() {
        assert!((sentiment_score(None, Some(&news(0.1))) - 0.3).abs() < 1e-12);
        assert_eq!(sentiment_score(None, Some(&news(0.5))), 1.0);
        assert_eq!(sentiment_score(None, Some(&news(-0.9))), -1.0);
        assert_eq!(sentiment_score(None, Some(&news(f64::NAN))), 0.0);
    }

    #[test]
    fn both_inputs_are_averaged() {
        // Extreme fear (+1.0) against mildly negative news (-0.3).
        let score = sentiment_score(Some(&fg(10)), Some(&news(-0.1)));
        assert!((score - 0.35).abs() < 1e-12);
    }
}
