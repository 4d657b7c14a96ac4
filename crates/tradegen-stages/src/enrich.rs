//! enrichGlassBox: the run's final result
use crate::keys::{AI_RESPONSE, MARKET_CONTEXT, PARSED, VALIDATED};
use crate::validate::CheckedTrade;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tradegen_core::telemetry::TelemetrySummary;
use tradegen_core::{to_output, ProviderResponse, Step, StepContext, StepError, TokenUsage};
use tradegen_glassbox::{EnrichedTrade, GlassBoxBuilder, RiskBands};

/// Why a run produced as many trades as it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// As many valid trades as requested
    Complete,
    /// Some valid trades, fewer than requested
    Partial,
    /// The provider answered with no usable trade; retry or switch provider
    ProviderReturnedNothing,
    /// Trades were generated but every one failed validation; relax the profile
    AllFiltered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub requested: usize,
    /// Parsed from the provider answer
    pub generated: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Valid trades handed back, at most `requested`
    pub returned: usize,
    /// Valid trades dropped beyond `requested`
    pub truncated: usize,
    pub outcome: GenerationOutcome,
}

impl GenerationSummary {
    pub fn new(requested: usize, generated: usize, valid: usize) -> Self {
        let returned = valid.min(requested);
        let outcome = if generated == 0 {
            GenerationOutcome::ProviderReturnedNothing
        } else if valid == 0 {
            GenerationOutcome::AllFiltered
        } else if returned < requested {
            GenerationOutcome::Partial
        } else {
            GenerationOutcome::Complete
        };
        Self {
            requested,
            generated,
            valid,
            invalid: generated - valid,
            returned,
            truncated: valid - returned,
            outcome,
        }
    }
}

/// Execution-level provenance shared by every trade's glass box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlassBoxData {
    pub execution_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub validation_profile: String,
    pub live_market_data: bool,
    pub telemetry: TelemetrySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub trades: Vec<EnrichedTrade>,
    pub invalid_trades: Vec<EnrichedTrade>,
    pub glass_box_data: GlassBoxData,
    pub summary: GenerationSummary,
}

#[derive(Debug, Default)]
pub struct EnrichGlassBox {
    bands: RiskBands,
}

impl EnrichGlassBox {
    pub fn new(bands: RiskBands) -> Self {
        Self { bands }
    }
}

#[async_trait]
impl Step for EnrichGlassBox {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<Value, StepError> {
        let validated = ctx.require(&VALIDATED)?;
        let response: Option<ProviderResponse> = ctx.get(&AI_RESPONSE);
        let market = ctx.get(&MARKET_CONTEXT).unwrap_or_default();
        let parse_error = ctx.get(&PARSED).and_then(|p| p.parse_error);
        let config = &ctx.input.config;
        let (capital, requested) = (config.capital, config.num_results);
        let telemetry = ctx.telemetry.summary();

        let enrich = |checked: CheckedTrade| -> EnrichedTrade {
            let volatility = market.quote(&checked.trade.asset).map(|q| q.volatility_pct());
            let mut builder = GlassBoxBuilder::new(&checked.trade, checked.report.clone(), telemetry.clone())
                .sizing(capital, requested)
                .volatility(volatility)
                .bands(self.bands);
            if let Some(r) = &response {
                builder = builder.provider(r.provider.clone(), r.model.clone(), r.usage);
            }
            builder.enrich()
        };

        let generated = validated.generated();
        let valid_count = validated.valid.len();
        let mut trades: Vec<EnrichedTrade> = validated.valid.into_iter().map(&enrich).collect();
        trades.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
        trades.truncate(requested);
        let invalid_trades: Vec<EnrichedTrade> = validated.invalid.into_iter().map(&enrich).collect();

        let summary = GenerationSummary::new(requested, generated, valid_count);
        let glass_box_data = GlassBoxData {
            execution_id: telemetry.execution_id.clone(),
            provider: response.as_ref().map(|r| r.provider.clone()),
            model: response.as_ref().map(|r| r.model.clone()),
            token_usage: response.as_ref().map(|r| r.usage),
            validation_profile: validated.profile,
            live_market_data: market.live_data,
            telemetry,
        };

        let log = json!({
            "outcome": summary.outcome,
            "requested": summary.requested,
            "generated": summary.generated,
            "valid": summary.valid,
            "returned": summary.returned,
            "parse_error": parse_error,
        });
        match summary.outcome {
            GenerationOutcome::Complete => ctx.info("trades enriched", &log),
            _ => ctx.warn("fewer trades than requested", &log),
        }

        to_output(&FinalResult {
            trades,
            invalid_trades,
            glass_box_data,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes() {
        assert_eq!(GenerationSummary::new(3, 0, 0).outcome, GenerationOutcome::ProviderReturnedNothing);
        assert_eq!(GenerationSummary::new(3, 4, 0).outcome, GenerationOutcome::AllFiltered);
        assert_eq!(GenerationSummary::new(3, 4, 2).outcome, GenerationOutcome::Partial);
        assert_eq!(GenerationSummary::new(3, 3, 3).outcome, GenerationOutcome::Complete);
    }

    #[test]
    fn test_truncation_counts() {
        let summary = GenerationSummary::new(2, 5, 4);
        assert_eq!(summary.returned, 2);
        assert_eq!(summary.truncated, 2);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.outcome, GenerationOutcome::Complete);
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(
            serde_json::to_value(GenerationOutcome::ProviderReturnedNothing).unwrap(),
            "provider_returned_nothing"
        );
    }
}
