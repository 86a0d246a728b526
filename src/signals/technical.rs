// =============================================================================
// Technical Layer Scorer
// =============================================================================
//
// Each sub-indicator maps onto a stepped scale (no interpolation):
//
//   RSI        <=20 => +1.0   <=30 => +0.5   >=80 => -1.0   >=70 => -0.5
//              40..=60 => 0.0   <40 => +0.25   else => -0.25
//   Stoch %K   <=20 => +0.7   >=80 => -0.7   else 0.0   (only when %K exists)
//   MACD       bullish cross +1.0, bearish cross -1.0,
//              else histogram >0 => +0.3, <0 => -0.3
//   %B         <-0.05 => +1.0   <0.05 => +0.5   >1.05 => -1.0   >0.95 => -0.5
//   EMA        bullish cross +1.0, bearish cross -1.0,
//              else short>long => +0.3, short<long => -0.3
//
// The boundary operators differ between indicators (`<=` for RSI, strict `<`
// for %B). They are kept exactly as listed.
//
// RSI, MACD, %B and EMA always contribute a sub-score (0.0 when their values
// are missing); Stoch-RSI is only counted when %K is present. The layer score
// is the unweighted mean.

use super::mean;
use crate::indicators::{
    BollingerReading, Crossover, EmaCrossoverReading, MacdReading, RsiReading, StochRsiReading,
    TechnicalIndicators,
};

pub fn technical_score(indicators: Option<&TechnicalIndicators>) -> f64 {
    let Some(ind) = indicators else {
        return 0.0;
    };

    let mut scores = Vec::with_capacity(5);
    scores.push(score_rsi(ind.rsi.as_ref()));
    if let Some(stoch) = score_stoch_rsi(ind.stoch_rsi.as_ref()) {
        scores.push(stoch);
    }
    scores.push(score_macd(ind.macd.as_ref()));
    scores.push(score_bollinger(ind.bollinger_bands.as_ref()));
    scores.push(score_ema(ind.ema_crossover.as_ref()));

    mean(&scores)
}

fn score_rsi(rsi: Option<&RsiReading>) -> f64 {
    let Some(v) = rsi.and_then(|r| r.value) else {
        return 0.0;
    };
    if v <= 20.0 {
        1.0
    } else if v <= 30.0 {
        0.5
    } else if v >= 80.0 {
        -1.0
    } else if v >= 70.0 {
        -0.5
    } else if (40.0..=60.0).contains(&v) {
        0.0
    } else if v < 40.0 {
        0.25
    } else {
        -0.25
    }
}

fn score_stoch_rsi(stoch: Option<&StochRsiReading>) -> Option<f64> {
    let k = stoch.and_then(|s| s.k)?;
    Some(if k <= 20.0 {
        0.7
    } else if k >= 80.0 {
        -0.7
    } else {
        0.0
    })
}

fn score_macd(macd: Option<&MacdReading>) -> f64 {
    let Some(macd) = macd else {
        return 0.0;
    };
    match macd.crossover {
        Crossover::Bullish => 1.0,
        Crossover::Bearish => -1.0,
        Crossover::Neutral => match macd.histogram {
            Some(h) if h > 0.0 => 0.3,
            Some(h) if h < 0.0 => -0.3,
            _ => 0.0,
        },
    }
}

fn score_bollinger(bb: Option<&BollingerReading>) -> f64 {
    let Some(pb) = bb.and_then(|b| b.percent_b) else {
        return 0.0;
    };
    if pb < -0.05 {
        1.0
    } else if pb < 0.05 {
        0.5
    } else if pb > 1.05 {
        -1.0
    } else if pb > 0.95 {
        -0.5
    } else {
        0.0
    }
}

fn score_ema(ema: Option<&EmaCrossoverReading>) -> f64 {
    let Some(ema) = ema else {
        return 0.0;
    };
    match ema.crossover {
        Crossover::Bullish => 1.0,
        Crossover::Bearish => -1.0,
        Crossover::Neutral => match (ema.ema_short, ema.ema_long) {
            // A zero EMA counts as missing.
            (Some(s), Some(l)) if s != 0.0 && l != 0.0 => {
                if s > l {
                    0.3
                } else if s < l {
                    -0.3
                } else {
                    0.0
                }
            }
            _ => 0.0,
        },
    }
}
