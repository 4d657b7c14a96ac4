//! Weighted confidence factors

use serde::{Deserialize, Serialize};
use tradegen_core::{ConfidenceFactor, Trade};
use tradegen_validation::ValidationReport;

/// Factors and their clamped weighted total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBreakdown {
    pub factors: Vec<ConfidenceFactor>,
    /// `Σ weight × score / 100`, clamped to 0..=100
    pub total: f64,
}

impl ConfidenceBreakdown {
    pub fn new(factors: Vec<ConfidenceFactor>) -> Self {
        Self {
            total: weighted_total(&factors),
            factors,
        }
    }
}

/// `Σ weight_i × score_i / 100` clamped to `[0, 100]`.
///
/// Terms are summed in sorted order so the result does not depend on the
/// order the factors were supplied in. Non-finite terms count as zero.
pub fn weighted_total(factors: &[ConfidenceFactor]) -> f64 {
    let mut terms: Vec<f64> = factors
        .iter()
        .map(|f| f.weight * f.score / 100.0)
        .map(|t| if t.is_finite() { t } else { 0.0 })
        .collect();
    terms.sort_by(f64::total_cmp);
    terms.iter().sum::<f64>().clamp(0.0, 100.0)
}

/// Factors to explain a trade whose model supplied none.
///
/// Model confidence (50), risk:reward quality (25, full marks at 1:3) and
/// share of validators passed (25).
pub fn derived_factors(trade: &Trade, report: &ValidationReport) -> Vec<ConfidenceFactor> {
    let rr_score = trade
        .risk_reward()
        .map(|rr| (rr / 3.0 * 100.0).min(100.0))
        .unwrap_or(0.0);
    let validation_score = if report.verdicts.is_empty() {
        100.0
    } else {
        report.passed as f64 / report.verdicts.len() as f64 * 100.0
    };

    vec![
        ConfidenceFactor::new("model_confidence", 50.0, trade.confidence.clamp(0.0, 100.0))
            .with_description("Confidence reported by the model"),
        ConfidenceFactor::new("risk_reward", 25.0, rr_score)
            .with_description("Reward relative to risk, full score at 1:3"),
        ConfidenceFactor::new("validation", 25.0, validation_score)
            .with_description(format!(
                "{} of {} validators passed",
                report.passed,
                report.verdicts.len()
            )),
    ]
}
