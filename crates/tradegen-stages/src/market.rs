//! fetchPrices and buildMarketContext
use crate::keys::PRICES;
use crate::prices::{PriceSource, DEFAULT_WATCHLIST};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tradegen_core::{to_output, Step, StepContext, StepError};
use tradegen_validation::{normalize_symbol, MarketQuote};

/// Symbols the request asks about, or the default watchlist
pub fn requested_symbols(assets: &[String]) -> Vec<String> {
    if assets.is_empty() {
        DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect()
    } else {
        assets.iter().map(|s| normalize_symbol(s)).collect()
    }
}

pub struct FetchPrices {
    source: Arc<dyn PriceSource>,
}

impl FetchPrices {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Step for FetchPrices {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<Value, StepError> {
        let symbols = requested_symbols(&ctx.input.config.assets);
        let quotes = self.source.fetch(&symbols).await?;
        if quotes.is_empty() {
            return Err(StepError::failed(format!(
                "{} returned no quotes for {}",
                self.source.name(),
                symbols.join(",")
            )));
        }
        ctx.info(
            "prices fetched",
            &json!({ "source": self.source.name(), "requested": symbols.len(), "received": quotes.len() }),
        );
        to_output(&quotes)
    }
}

/// Market snapshot handed to the prompt and the validators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContext {
    pub quotes: Vec<MarketQuote>,
    /// Requested symbols without a quote
    pub missing: Vec<String>,
    /// False when the price step failed and the run continues blind
    pub live_data: bool,
}

impl MarketContext {
    pub fn quote(&self, asset: &str) -> Option<&MarketQuote> {
        let key = normalize_symbol(asset);
        self.quotes.iter().find(|q| {
            let symbol = normalize_symbol(&q.symbol);
            symbol == key || symbol == format!("{key}USDT")
        })
    }

    /// One line per quote for the prompt
    pub fn describe(&self) -> Vec<String> {
        self.quotes
            .iter()
            .map(|q| {
                format!(
                    "{}: price {}, 24h change {:+.2}%, range {}-{}, quote volume {:.0}",
                    q.symbol, q.price, q.change_24h_pct, q.low_24h, q.high_24h, q.volume_24h
                )
            })
            .collect()
    }
}

/// Tolerates a missing price result: the run continues without live data.
#[derive(Debug, Default)]
pub struct BuildMarketContext;

#[async_trait]
impl Step for BuildMarketContext {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<Value, StepError> {
        let symbols = requested_symbols(&ctx.input.config.assets);
        let Some(quotes) = ctx.get(&PRICES) else {
            ctx.warn(
                "no live prices available; continuing without market data",
                &json!({ "symbols": symbols }),
            );
            return to_output(&MarketContext {
                quotes: Vec::new(),
                missing: symbols,
                live_data: false,
            });
        };

        let quoted: Vec<String> = quotes.iter().map(|q| normalize_symbol(&q.symbol)).collect();
        let missing: Vec<String> = symbols.into_iter().filter(|s| !quoted.contains(s)).collect();
        if !missing.is_empty() {
            ctx.warn("some symbols have no quote", &json!({ "missing": missing }));
        }
        to_output(&MarketContext {
            quotes,
            missing,
            live_data: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_symbols() {
        assert_eq!(requested_symbols(&[]).len(), DEFAULT_WATCHLIST.len());
        assert_eq!(requested_symbols(&["btc/usdt".into()]), vec!["BTCUSDT"]);
    }

    #[test]
    fn test_describe() {
        let ctx = MarketContext {
            quotes: vec![MarketQuote::new("BTCUSDT", 64000.0)
                .with_change(1.5)
                .with_range(63000.0, 65000.0)
                .with_volume(1e9)],
            missing: vec![],
            live_data: true,
        };
        assert_eq!(
            ctx.describe(),
            vec!["BTCUSDT: price 64000, 24h change +1.50%, range 63000-65000, quote volume 1000000000"]
        );
        assert!(ctx.quote("btc").is_some());
    }
}
