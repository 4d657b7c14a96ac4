//! Live price sources
use crate::error::PriceError;
use async_trait::async_trait;
use serde::Deserialize;
use tradegen_validation::{normalize_symbol, MarketQuote};

/// Symbols priced when the request names none
pub const DEFAULT_WATCHLIST: &[&str] = &["BTCUSDT", "ETHUSDT", "SOLUSDT", "BNBUSDT", "XRPUSDT"];

pub const BINANCE_SPOT_URL: &str = "https://api.binance.com";

#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    /// 24h quotes for `symbols`. Unknown symbols may be omitted.
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<MarketQuote>, PriceError>;
}

/// Binance-style `GET /api/v3/ticker/24hr?symbols=[..]`
#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: reqwest::Client,
    base_url: String,
}

/// Ticker as returned by the exchange: every number is a string
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    symbol: String,
    last_price: String,
    #[serde(default)]
    price_change_percent: Option<String>,
    #[serde(default)]
    high_price: Option<String>,
    #[serde(default)]
    low_price: Option<String>,
    #[serde(default)]
    quote_volume: Option<String>,
}

impl Ticker24h {
    fn into_quote(self) -> Result<MarketQuote, PriceError> {
        let number = |field: &str, raw: Option<&str>| -> Result<f64, PriceError> {
            match raw {
                None => Ok(0.0),
                Some(s) => s
                    .parse::<f64>()
                    .map_err(|_| PriceError::Malformed(format!("{} {} = {:?}", self.symbol, field, s))),
            }
        };
        let price = number("lastPrice", Some(&self.last_price))?;
        Ok(MarketQuote {
            change_24h_pct: number("priceChangePercent", self.price_change_percent.as_deref())?,
            high_24h: number("highPrice", self.high_price.as_deref())?,
            low_24h: number("lowPrice", self.low_price.as_deref())?,
            volume_24h: number("quoteVolume", self.quote_volume.as_deref())?,
            price,
            symbol: self.symbol,
        })
    }
}

impl HttpPriceSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, BINANCE_SPOT_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, symbols: &[String]) -> Result<Vec<MarketQuote>, PriceError> {
        let symbols: Vec<String> = symbols.iter().map(|s| normalize_symbol(s)).collect();
        let symbols_param = serde_json::to_string(&symbols)
            .map_err(|e| PriceError::Malformed(e.to_string()))?;
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);

        tracing::debug!(count = symbols.len(), "fetching 24h tickers");
        let response = self
            .client
            .get(&url)
            .query(&[("symbols", symbols_param)])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("msg").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(PriceError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let tickers: Vec<Ticker24h> =
            serde_json::from_str(&body).map_err(|e| PriceError::Malformed(e.to_string()))?;
        tickers.into_iter().map(Ticker24h::into_quote).collect()
    }
}

/// Fixed quotes; offline runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    quotes: Vec<MarketQuote>,
}

impl StaticPriceSource {
    pub fn new(quotes: Vec<MarketQuote>) -> Self {
        Self { quotes }
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, symbols: &[String]) -> Result<Vec<MarketQuote>, PriceError> {
        if symbols.is_empty() {
            return Ok(self.quotes.clone());
        }
        let wanted: Vec<String> = symbols.iter().map(|s| normalize_symbol(s)).collect();
        Ok(self
            .quotes
            .iter()
            .filter(|q| wanted.contains(&normalize_symbol(&q.symbol)))
            .cloned()
            .collect())
    }
}
