// =============================================================================
// Cache keys — `provider:endpoint:param...`
// =============================================================================
//
// Every request parameter that changes the upstream response is part of the
// key, so distinct parameter sets never collide.

pub fn coingecko_markets(per_page: usize) -> String {
    format!("coingecko:markets:top{per_page}")
}

pub fn coingecko_global() -> String {
    "coingecko:global".to_string()
}

pub fn coingecko_ohlc(coin_id: &str, days: u32) -> String {
    format!("coingecko:ohlc:{coin_id}:{days}")
}

pub fn binance_klines(symbol: &str, interval: &str, limit: u32) -> String {
    format!("binance:klines:{symbol}:{interval}:{limit}")
}

pub fn binance_funding(symbol: &str) -> String {
    format!("binance:funding:{symbol}")
}

pub fn binance_open_interest(symbol: &str) -> String {
    format!("binance:open_interest:{symbol}")
}

pub fn binance_long_short(symbol: &str, period: &str) -> String {
    format!("binance:long_short:{symbol}:{period}")
}

pub fn fear_greed(limit: u32) -> String {
    format!("alternative_me:fng:{limit}")
}

pub fn crypto_news(categories: &str) -> String {
    format!("cryptocompare:news:{categories}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_are_part_of_the_key() {
        assert_ne!(binance_klines("BTC", "4h", 100), binance_klines("BTC", "1h", 100));
        assert_ne!(binance_klines("BTC", "4h", 100), binance_klines("BTC", "4h", 50));
        assert_ne!(fear_greed(1), fear_greed(30));
        assert_ne!(coingecko_ohlc("bitcoin", 14), coingecko_ohlc("bitcoin", 7));
        assert_ne!(binance_funding("ETH"), binance_open_interest("ETH"));
    }

    #[test]
    fn keys_are_stable() {
        assert_eq!(binance_klines("SOL", "4h", 100), "binance:klines:SOL:4h:100");
        assert_eq!(coingecko_markets(100), coingecko_markets(100));
    }
}
