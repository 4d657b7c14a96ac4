//! Live market data the price-aware rules compare against

use crate::profile::ValidationProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 24h ticker for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub change_24h_pct: f64,
    #[serde(default)]
    pub high_24h: f64,
    #[serde(default)]
    pub low_24h: f64,
    /// Quote-currency volume
    #[serde(default)]
    pub volume_24h: f64,
}

impl MarketQuote {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change_24h_pct: 0.0,
            high_24h: price,
            low_24h: price,
            volume_24h: 0.0,
        }
    }

    pub fn with_volume(mut self, volume_24h: f64) -> Self {
        self.volume_24h = volume_24h;
        self
    }

    pub fn with_range(mut self, low_24h: f64, high_24h: f64) -> Self {
        self.low_24h = low_24h;
        self.high_24h = high_24h;
        self
    }

    pub fn with_change(mut self, change_24h_pct: f64) -> Self {
        self.change_24h_pct = change_24h_pct;
        self
    }

    /// 24h range as a percentage of price, falling back to |change| when
    /// no range was reported
    pub fn volatility_pct(&self) -> f64 {
        if self.price <= 0.0 {
            return 0.0;
        }
        let range = self.high_24h - self.low_24h;
        if range > 0.0 {
            range / self.price * 100.0
        } else {
            self.change_24h_pct.abs()
        }
    }
}

/// Canonical symbol key: uppercase, separators dropped ("btc/usdt" → "BTCUSDT")
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| !matches!(c, '/' | '-' | '_' | ' '))
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Everything a rule may consult besides the trade itself
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub profile: ValidationProfile,
    quotes: HashMap<String, MarketQuote>,
}

impl ValidationContext {
    pub fn new(profile: ValidationProfile) -> Self {
        Self {
            profile,
            quotes: HashMap::new(),
        }
    }

    pub fn with_quotes(mut self, quotes: impl IntoIterator<Item = MarketQuote>) -> Self {
        for quote in quotes {
            self.quotes.insert(normalize_symbol(&quote.symbol), quote);
        }
        self
    }

    /// Look up a quote; bare bases ("BTC") also match their USDT pair
    pub fn quote(&self, asset: &str) -> Option<&MarketQuote> {
        let key = normalize_symbol(asset);
        self.quotes
            .get(&key)
            .or_else(|| self.quotes.get(&format!("{key}USDT")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_lookup() {
        let ctx = ValidationContext::default().with_quotes([MarketQuote::new("BTCUSDT", 64_000.0)]);
        assert!(ctx.quote("btc/usdt").is_some());
        assert!(ctx.quote("BTC").is_some());
        assert!(ctx.quote("ETH").is_none());
    }

    #[test]
    fn test_volatility() {
        let quote = MarketQuote::new("ETHUSDT", 2_000.0).with_range(1_900.0, 2_100.0);
        assert!((quote.volatility_pct() - 10.0).abs() < 1e-9);
        let flat = MarketQuote::new("ETHUSDT", 2_000.0).with_change(-3.5);
        assert_eq!(flat.volatility_pct(), 3.5);
    }
}
