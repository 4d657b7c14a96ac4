//! generatePrompt
use crate::keys::MARKET_CONTEXT;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tradegen_core::{to_output, PipelineInput, Step, StepContext, StepError};

/// Shape the model is asked to answer with
static RESPONSE_EXAMPLE: Lazy<String> = Lazy::new(|| {
    let example = json!([{
        "asset": "BTCUSDT",
        "direction": "long",
        "entryPrice": 64000.0,
        "takeProfit": 66500.0,
        "stopLoss": 63000.0,
        "leverage": 3,
        "confidence": 72,
        "timeframe": "4h",
        "reasoning": "Why the setup matches the strategy",
        "marketAnalysis": "Relevant market structure",
        "matchedCriteria": ["criterion from the strategy"],
        "confidenceFactors": [{ "name": "trend", "weight": 60, "score": 80 }]
    }]);
    serde_json::to_string_pretty(&example).unwrap_or_default()
});

static SYSTEM_PROMPT: Lazy<String> = Lazy::new(|| {
    format!(
        "You are a disciplined crypto futures analyst. Apply the user's strategy to the \
         market data provided and propose concrete trades.\n\
         Answer with a JSON array only, no prose, using exactly this shape:\n{}\n\
         Rules: direction is \"long\" or \"short\"; for longs stopLoss < entryPrice < takeProfit, \
         for shorts takeProfit < entryPrice < stopLoss; confidence is 0-100; \
         confidenceFactors weights sum to 100.",
        *RESPONSE_EXAMPLE
    )
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn system_prompt() -> &'static str {
    &SYSTEM_PROMPT
}

/// Strategy, sizing constraints and market lines
pub fn user_prompt(input: &PipelineInput, market_lines: &[String]) -> String {
    let config = &input.config;
    let mut out = String::new();
    out.push_str(&format!("Strategy: {}\n{}\n\n", input.strategy.name, input.strategy.content.trim()));
    out.push_str(&format!(
        "Constraints:\n- capital: {}\n- leverage: up to {}x\n- minimum confidence: {}\n- number of trades: {}\n",
        config.capital, config.leverage, config.min_confidence, config.num_results
    ));
    if let Some(horizon) = &config.execution_time {
        out.push_str(&format!("- holding horizon: {}\n", horizon));
    }
    out.push('\n');
    if market_lines.is_empty() {
        out.push_str("Market data: unavailable. Use recent typical levels and say so in marketAnalysis.\n");
    } else {
        out.push_str("Market data (24h):\n");
        for line in market_lines {
            out.push_str("- ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct GeneratePrompt;

#[async_trait]
impl Step for GeneratePrompt {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<Value, StepError> {
        let market = ctx.get(&MARKET_CONTEXT).unwrap_or_default();
        let prompt = Prompt {
            system: system_prompt().to_string(),
            user: user_prompt(ctx.input, &market.describe()),
        };
        ctx.debug(
            "prompt generated",
            &json!({ "system_chars": prompt.system.len(), "user_chars": prompt.user.len() }),
        );
        to_output(&prompt)
    }
}
