//! Data Model: pipeline input, trades and normalized provider responses
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tradegen_telemetry::REDACTED;

/// Provider credential. Never printed or serialized in clear.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building an auth header
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ApiKey({})", REDACTED)
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ApiKey)
    }
}

/// User-authored natural-language strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub content: String,
    /// Fields owned by the strategy store that the pipeline passes through
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Strategy {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }
}

fn default_leverage() -> f64 {
    1.0
}

fn default_min_confidence() -> f64 {
    60.0
}

fn default_num_results() -> usize {
    3
}

/// Generation settings supplied with each run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Capital available, in quote currency
    pub capital: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    /// Holding horizon as free text (e.g. "4h", "swing")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<String>,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    pub ai_provider: String,
    #[serde(default)]
    pub api_key: ApiKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Symbols to price; empty means the default watchlist
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GenerationConfig {
    pub fn new(ai_provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            capital: 1_000.0,
            leverage: default_leverage(),
            execution_time: None,
            min_confidence: default_min_confidence(),
            num_results: default_num_results(),
            ai_provider: ai_provider.into(),
            api_key: ApiKey::new(api_key),
            model: None,
            assets: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// `{strategy, config}` handed to `Pipeline::execute`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInput {
    pub strategy: Strategy,
    pub config: GenerationConfig,
}

impl PipelineInput {
    pub fn new(strategy: Strategy, config: GenerationConfig) -> Self {
        Self { strategy, config }
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "buy", alias = "LONG", alias = "BUY", alias = "Long")]
    Long,
    #[serde(alias = "sell", alias = "SHORT", alias = "SELL", alias = "Short")]
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// One scored input to the overall confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactor {
    pub name: String,
    /// Relative weight, in percent
    pub weight: f64,
    /// Factor score, 0-100
    pub score: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ConfidenceFactor {
    pub fn new(name: impl Into<String>, weight: f64, score: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            score,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A trade proposal. Value object: the pipeline enriches it, never persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub asset: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub leverage: f64,
    /// Model-reported confidence, 0-100
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_analysis: Option<String>,
    #[serde(default)]
    pub matched_criteria: Vec<String>,
    #[serde(default)]
    pub confidence_factors: Vec<ConfidenceFactor>,
}

impl Trade {
    /// Distance from entry to take-profit
    pub fn reward(&self) -> f64 {
        (self.take_profit - self.entry_price).abs()
    }

    /// Distance from entry to stop-loss
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    /// Reward divided by risk; `None` when the stop sits on the entry
    pub fn risk_reward(&self) -> Option<f64> {
        let risk = self.risk();
        if risk <= f64::EPSILON {
            None
        } else {
            Some(self.reward() / risk)
        }
    }

    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }
}

/// Token accounting reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Normalized AI call result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub provider: String,
    pub model: String,
    pub content: String,
    pub usage: TokenUsage,
    /// Unmodified provider payload, kept for audit
    pub raw: Value,
}
