//! parseResponse: free-form model text → trades
use crate::keys::AI_RESPONSE;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tradegen_core::{to_output, ConfidenceFactor, Direction, Step, StepContext, StepError, Trade};

/// An entry of the model's answer that could not be turned into a trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEntry {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTrades {
    pub trades: Vec<Trade>,
    pub skipped: Vec<SkippedEntry>,
    /// Set when no JSON could be found in the answer at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

/// Body of the first fenced block, if any
fn strip_fences(content: &str) -> &str {
    let Some(start) = content.find("```") else {
        return content;
    };
    let after_fence = &content[start + 3..];
    // skip the info string ("json") up to the end of the line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    }
}

fn try_slice(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Locate a JSON document in model output: fenced, bare, or embedded in prose
pub fn extract_json(content: &str) -> Option<Value> {
    let text = strip_fences(content).trim();
    serde_json::from_str(text)
        .ok()
        .or_else(|| try_slice(text, '[', ']'))
        .or_else(|| try_slice(text, '{', '}'))
}

/// Trade entries of an answer: a bare array, `{"trades": [..]}`, or a single trade object
fn trade_entries(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("trades") {
            Some(Value::Array(items)) => items,
            _ if map.contains_key("asset") || map.contains_key("symbol") => vec![Value::Object(map)],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn field<'v>(entry: &'v Value, names: &[&str]) -> Option<&'v Value> {
    names.iter().find_map(|n| entry.get(*n)).filter(|v| !v.is_null())
}

/// Numbers may arrive as strings ("64,000.5", "$12")
fn number(entry: &Value, names: &[&str]) -> Option<f64> {
    match field(entry, names)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .trim_end_matches('x')
            .parse()
            .ok(),
        _ => None,
    }
}

fn text(entry: &Value, names: &[&str]) -> Option<String> {
    field(entry, names).and_then(Value::as_str).map(|s| s.trim().to_string())
}

/// Build one trade from a loosely shaped entry
pub fn parse_trade(entry: &Value, default_leverage: f64) -> Result<Trade, String> {
    if !entry.is_object() {
        return Err("entry is not an object".to_string());
    }
    let asset = text(entry, &["asset", "symbol", "pair"]).ok_or("missing asset")?;
    let direction: Direction = field(entry, &["direction", "side", "type"])
        .ok_or("missing direction")
        .and_then(|d| serde_json::from_value(d.clone()).map_err(|_| "unknown direction"))?;
    let entry_price = number(entry, &["entryPrice", "entry", "entry_price"]).ok_or("missing entryPrice")?;
    let take_profit = number(entry, &["takeProfit", "tp", "target", "take_profit"]).ok_or("missing takeProfit")?;
    let stop_loss = number(entry, &["stopLoss", "sl", "stop", "stop_loss"]).ok_or("missing stopLoss")?;

    // models sometimes answer 0.72 for 72%
    let confidence = number(entry, &["confidence", "confidenceScore"])
        .map(|c| if c > 0.0 && c < 1.0 { c * 100.0 } else { c })
        .unwrap_or(0.0);

    let matched_criteria = field(entry, &["matchedCriteria", "matched_criteria", "criteria"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    let confidence_factors: Vec<ConfidenceFactor> = field(entry, &["confidenceFactors", "confidence_factors"])
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    Ok(Trade {
        id: text(entry, &["id"]).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        asset: asset.to_ascii_uppercase(),
        direction,
        entry_price,
        take_profit,
        stop_loss,
        leverage: number(entry, &["leverage"]).unwrap_or(default_leverage),
        confidence,
        timeframe: text(entry, &["timeframe", "executionTime"]),
        reasoning: text(entry, &["reasoning", "rationale"]).unwrap_or_default(),
        market_analysis: text(entry, &["marketAnalysis", "market_analysis", "analysis"]),
        matched_criteria,
        confidence_factors,
    })
}

pub fn parse_content(content: &str, default_leverage: f64) -> ParsedTrades {
    let Some(value) = extract_json(content) else {
        return ParsedTrades {
            parse_error: Some("no JSON found in provider answer".to_string()),
            ..Default::default()
        };
    };

    let mut parsed = ParsedTrades::default();
    for (index, entry) in trade_entries(value).iter().enumerate() {
        match parse_trade(entry, default_leverage) {
            Ok(trade) => parsed.trades.push(trade),
            Err(reason) => parsed.skipped.push(SkippedEntry { index, reason }),
        }
    }
    parsed
}

#[derive(Debug, Default)]
pub struct ParseResponse;

#[async_trait]
impl Step for ParseResponse {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<Value, StepError> {
        let response = ctx.require(&AI_RESPONSE)?;
        let parsed = parse_content(&response.content, ctx.input.config.leverage);

        if let Some(error) = &parsed.parse_error {
            ctx.warn(error, &json!({ "content_chars": response.content.len() }));
        }
        if !parsed.skipped.is_empty() {
            ctx.warn("skipped malformed trade entries", &parsed.skipped);
        }
        ctx.info(
            "response parsed",
            &json!({ "trades": parsed.trades.len(), "skipped": parsed.skipped.len() }),
        );
        to_output(&parsed)
    }
}
