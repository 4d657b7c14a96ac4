//! validateTrades
use crate::keys::{MARKET_CONTEXT, PARSED};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tradegen_core::{to_output, Step, StepContext, StepError, Trade};
use tradegen_validation::{TradeValidator, ValidationContext, ValidationProfile, ValidationReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedTrade {
    pub trade: Trade,
    pub report: ValidationReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedTrades {
    /// Profile name after request overrides
    pub profile: String,
    pub valid: Vec<CheckedTrade>,
    pub invalid: Vec<CheckedTrade>,
}

impl ValidatedTrades {
    pub fn generated(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }
}

pub struct ValidateTrades {
    validator: Arc<TradeValidator>,
    profile: ValidationProfile,
}

impl ValidateTrades {
    pub fn new(validator: Arc<TradeValidator>, profile: ValidationProfile) -> Self {
        Self { validator, profile }
    }
}

#[async_trait]
impl Step for ValidateTrades {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<Value, StepError> {
        let parsed = ctx.require(&PARSED)?;
        let market = ctx.get(&MARKET_CONTEXT).unwrap_or_default();

        let profile = self.profile.clone().with_request(&ctx.input.config);
        let profile_name = profile.name.clone();
        let vctx = ValidationContext::new(profile).with_quotes(market.quotes);

        let (valid, invalid) = self.validator.partition(parsed.trades, &vctx);
        for (trade, report) in &invalid {
            if let Err(e) = report.ensure_usable(trade) {
                ctx.warn("trade rejected", &json!({ "error": e.to_string() }));
            }
        }
        ctx.info(
            "trades validated",
            &json!({ "profile": profile_name, "valid": valid.len(), "invalid": invalid.len() }),
        );

        let into_checked = |items: Vec<(Trade, ValidationReport)>| -> Vec<CheckedTrade> {
            items
                .into_iter()
                .map(|(trade, report)| CheckedTrade { trade, report })
                .collect()
        };
        to_output(&ValidatedTrades {
            profile: profile_name,
            valid: into_checked(valid),
            invalid: into_checked(invalid),
        })
    }
}
