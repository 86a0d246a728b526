// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math over candle closes/volumes, and the
// reading records handed to the technical and volume scorers.
//
// Every reading field is `Option`: a reading that exists but could not be
// computed (too little data, flat window, non-finite result) keeps its parent
// record with `None` values, which the scorers treat as neutral.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod stoch_rsi;

use serde::{Deserialize, Serialize};

use crate::types::{Bias, Candle};

/// Periods used for the indicator bundle.
pub const RSI_PERIOD: usize = 14;
pub const STOCH_RSI_PERIOD: usize = 14;
pub const STOCH_SMOOTHING: usize = 3;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_STD_DEV: f64 = 2.0;
pub const EMA_SHORT: usize = 9;
pub const EMA_LONG: usize = 21;

/// Minimum number of candles before an indicator bundle is produced.
pub const MIN_CANDLES: usize = 30;

// =============================================================================
// Reading types
// =============================================================================

/// Oscillator zone label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Oversold,
    #[default]
    Neutral,
    Overbought,
}

/// Direction of a line crossing on the most recent bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crossover {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RsiReading {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub signal: Zone,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StochRsiReading {
    /// %K scaled to 0-100.
    #[serde(default)]
    pub k: Option<f64>,
    /// %D scaled to 0-100.
    #[serde(default)]
    pub d: Option<f64>,
    #[serde(default)]
    pub signal: Zone,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    #[serde(default)]
    pub macd_line: Option<f64>,
    #[serde(default)]
    pub signal_line: Option<f64>,
    #[serde(default)]
    pub histogram: Option<f64>,
    #[serde(default)]
    pub crossover: Crossover,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerReading {
    #[serde(default)]
    pub upper: Option<f64>,
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub percent_b: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmaCrossoverReading {
    #[serde(default)]
    pub ema_short: Option<f64>,
    #[serde(default)]
    pub ema_long: Option<f64>,
    #[serde(default)]
    pub crossover: Crossover,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObvReading {
    #[serde(default)]
    pub trend: Bias,
    #[serde(default)]
    pub value: Option<f64>,
}

/// The full indicator bundle for one coin. A `None` field means the
/// indicator was not supplied at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    #[serde(default)]
    pub rsi: Option<RsiReading>,
    #[serde(default)]
    pub stoch_rsi: Option<StochRsiReading>,
    #[serde(default)]
    pub macd: Option<MacdReading>,
    #[serde(default)]
    pub bollinger_bands: Option<BollingerReading>,
    #[serde(default)]
    pub ema_crossover: Option<EmaCrossoverReading>,
    #[serde(default)]
    pub obv: Option<ObvReading>,
}

// =============================================================================
// Bundle computation
// =============================================================================

/// Compute every indicator from `candles` (oldest first).
///
/// Returns `None` with fewer than [`MIN_CANDLES`] candles. OBV needs a volume
/// on every candle; otherwise it is reported as a neutral trend with no value.
pub fn compute_all(candles: &[Candle]) -> Option<TechnicalIndicators> {
    if candles.len() < MIN_CANDLES {
        return None;
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Option<Vec<f64>> = candles.iter().map(|c| c.volume).collect();

    let obv = match volumes {
        Some(volumes) => obv::obv_reading(&closes, &volumes),
        None => ObvReading::default(),
    };

    Some(TechnicalIndicators {
        rsi: Some(rsi::rsi_reading(&closes, RSI_PERIOD)),
        stoch_rsi: Some(stoch_rsi::stoch_rsi_reading(
            &closes,
            STOCH_RSI_PERIOD,
            STOCH_SMOOTHING,
            STOCH_SMOOTHING,
        )),
        macd: Some(macd::macd_reading(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL)),
        bollinger_bands: Some(bollinger::bollinger_reading(&closes, BB_PERIOD, BB_STD_DEV)),
        ema_crossover: Some(ema::ema_crossover_reading(&closes, EMA_SHORT, EMA_LONG)),
        obv: Some(obv),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(closes: &[f64], with_volume: bool) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                time: i as i64 * 14_400,
                open: c,
                high: c * 1.01,
                low: c * 0.99,
                close: c,
                volume: with_volume.then_some(1_000.0 + i as f64),
            })
            .collect()
    }

    #[test]
    fn too_few_candles_yield_nothing() {
        let closes: Vec<f64> = (1..30).map(|x| x as f64).collect();
        assert!(compute_all(&candles(&closes, true)).is_none());
    }

    #[test]
    fn rising_market_bundle() {
        let closes: Vec<f64> = (1..=100).map(|x| 100.0 + x as f64).collect();
        let bundle = compute_all(&candles(&closes, true)).unwrap();

        let rsi = bundle.rsi.unwrap();
        assert_eq!(rsi.value, Some(100.0));
        assert_eq!(rsi.signal, Zone::Overbought);

        let ema = bundle.ema_crossover.unwrap();
        assert!(ema.ema_short.unwrap() > ema.ema_long.unwrap());

        assert_eq!(bundle.obv.unwrap().trend, Bias::Bullish);
        assert!(bundle.macd.unwrap().histogram.is_some());
    }

    #[test]
    fn missing_volume_gives_neutral_obv() {
        let closes: Vec<f64> = (1..=40).map(|x| x as f64).collect();
        let bundle = compute_all(&candles(&closes, false)).unwrap();
        let obv = bundle.obv.unwrap();
        assert_eq!(obv.trend, Bias::Neutral);
        assert!(obv.value.is_none());
    }

    #[test]
    fn readings_deserialise_with_missing_fields() {
        let json = r#"{ "rsi": { "value": 25.0 }, "macd": { "crossover": "bullish" } }"#;
        let bundle: TechnicalIndicators = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.rsi.unwrap().value, Some(25.0));
        assert_eq!(bundle.macd.unwrap().crossover, Crossover::Bullish);
        assert!(bundle.stoch_rsi.is_none());
    }
}
