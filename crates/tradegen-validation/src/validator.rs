//! Aggregation of rule verdicts per trade

use crate::error::ValidationError;
use crate::market::ValidationContext;
use crate::rules::{
    ConfidenceRule, EntryDeviationRule, LeverageRule, PriceBoundsRule, RiskRewardRule, Validator,
    VolumeRule,
};
use crate::verdict::{Severity, ValidationVerdict};
use serde::{Deserialize, Serialize};
use tradegen_core::Trade;

/// Every verdict for one trade plus the counts derived from them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub verdicts: Vec<ValidationVerdict>,
    pub passed: usize,
    pub failed: usize,
    /// Failing error-severity verdicts
    pub errors: usize,
    /// Failing warning-severity verdicts
    pub warnings: usize,
    /// No failing error-severity verdict
    pub usable: bool,
}

impl ValidationReport {
    pub fn from_verdicts(verdicts: Vec<ValidationVerdict>) -> Self {
        let passed = verdicts.iter().filter(|v| v.passed).count();
        let errors = verdicts
            .iter()
            .filter(|v| !v.passed && v.severity == Severity::Error)
            .count();
        let warnings = verdicts
            .iter()
            .filter(|v| !v.passed && v.severity == Severity::Warning)
            .count();
        Self {
            failed: verdicts.len() - passed,
            passed,
            errors,
            warnings,
            usable: errors == 0,
            verdicts,
        }
    }

    pub fn blocking(&self) -> impl Iterator<Item = &ValidationVerdict> {
        self.verdicts.iter().filter(|v| v.is_blocking())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationVerdict> {
        self.verdicts
            .iter()
            .filter(|v| !v.passed && v.severity == Severity::Warning)
    }

    /// `Err` naming the blocking rules when the trade is unusable
    pub fn ensure_usable(&self, trade: &Trade) -> Result<(), ValidationError> {
        if self.usable {
            return Ok(());
        }
        Err(ValidationError {
            trade_id: trade.id.clone(),
            asset: trade.asset.clone(),
            rules: self.blocking().map(|v| v.rule.clone()).collect(),
        })
    }
}

/// Runs a configured rule set over trades
pub struct TradeValidator {
    rules: Vec<Box<dyn Validator>>,
}

impl TradeValidator {
    /// No rules; every trade is usable
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The six standard rules
    pub fn standard() -> Self {
        Self::empty()
            .with_rule(RiskRewardRule)
            .with_rule(PriceBoundsRule)
            .with_rule(ConfidenceRule)
            .with_rule(LeverageRule)
            .with_rule(EntryDeviationRule)
            .with_rule(VolumeRule)
    }

    pub fn with_rule(mut self, rule: impl Validator + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn validate(&self, trade: &Trade, ctx: &ValidationContext) -> ValidationReport {
        let verdicts: Vec<ValidationVerdict> = self.rules.iter().map(|r| r.check(trade, ctx)).collect();
        let report = ValidationReport::from_verdicts(verdicts);
        if !report.usable {
            tracing::debug!(
                trade = %trade.id,
                asset = %trade.asset,
                errors = report.errors,
                "trade rejected by validators"
            );
        }
        report
    }

    /// Split trades into usable and invalid, keeping each report
    pub fn partition(
        &self,
        trades: Vec<Trade>,
        ctx: &ValidationContext,
    ) -> (Vec<(Trade, ValidationReport)>, Vec<(Trade, ValidationReport)>) {
        trades
            .into_iter()
            .map(|t| {
                let report = self.validate(&t, ctx);
                (t, report)
            })
            .partition(|(_, report)| report.usable)
    }
}

impl Default for TradeValidator {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for TradeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeValidator")
            .field("rules", &self.rule_names())
            .finish()
    }
}
