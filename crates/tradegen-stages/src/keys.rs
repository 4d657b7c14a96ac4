//! Step names and typed handles to their outputs
use crate::enrich::FinalResult;
use crate::market::MarketContext;
use crate::parse::ParsedTrades;
use crate::prompt::Prompt;
use crate::validate::ValidatedTrades;
use tradegen_core::{ProviderResponse, StepKey};
use tradegen_validation::MarketQuote;

pub const PRICES: StepKey<Vec<MarketQuote>> = StepKey::new("fetchPrices");
pub const MARKET_CONTEXT: StepKey<MarketContext> = StepKey::new("buildMarketContext");
pub const PROMPT: StepKey<Prompt> = StepKey::new("generatePrompt");
pub const AI_RESPONSE: StepKey<ProviderResponse> = StepKey::new("callAIProvider");
pub const PARSED: StepKey<ParsedTrades> = StepKey::new("parseResponse");
pub const VALIDATED: StepKey<ValidatedTrades> = StepKey::new("validateTrades");
pub const FINAL: StepKey<FinalResult> = StepKey::new("enrichGlassBox");
