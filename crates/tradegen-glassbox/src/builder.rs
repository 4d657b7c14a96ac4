//! Glass Box assembly
//!
//! Deterministic: the same trade, verdicts and telemetry summary always give
//! the same explanation (the timestamp is the execution's start time).

use crate::confidence::{derived_factors, ConfidenceBreakdown};
use crate::risk::{RiskBands, RiskMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tradegen_core::telemetry::TelemetrySummary;
use tradegen_core::{TokenUsage, Trade};
use tradegen_validation::ValidationReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reasoning {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

/// Where the trade came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    pub execution_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub telemetry: TelemetrySummary,
    pub generated_at: DateTime<Utc>,
}

/// Explanation attached to one trade. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlassBox {
    pub reasoning: Reasoning,
    pub matched_criteria: Vec<String>,
    pub confidence: ConfidenceBreakdown,
    pub validation: ValidationReport,
    pub risk: RiskMetrics,
    pub audit: AuditTrail,
}

/// A trade together with its explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTrade {
    #[serde(flatten)]
    pub trade: Trade,
    pub glass_box: GlassBox,
}

impl EnrichedTrade {
    pub fn confidence(&self) -> f64 {
        self.glass_box.confidence.total
    }

    pub fn is_usable(&self) -> bool {
        self.glass_box.validation.usable
    }
}

pub struct GlassBoxBuilder<'a> {
    trade: &'a Trade,
    report: ValidationReport,
    telemetry: TelemetrySummary,
    reasoning: Option<String>,
    provider: Option<(String, String, TokenUsage)>,
    capital: f64,
    num_results: usize,
    volatility_pct: Option<f64>,
    bands: RiskBands,
}

impl<'a> GlassBoxBuilder<'a> {
    pub fn new(trade: &'a Trade, report: ValidationReport, telemetry: TelemetrySummary) -> Self {
        Self {
            trade,
            report,
            telemetry,
            reasoning: None,
            provider: None,
            capital: 0.0,
            num_results: 1,
            volatility_pct: None,
            bands: RiskBands::default(),
        }
    }

    /// Override the trade's own reasoning text
    pub fn reasoning(mut self, text: impl Into<String>) -> Self {
        self.reasoning = Some(text.into());
        self
    }

    pub fn provider(mut self, provider: impl Into<String>, model: impl Into<String>, usage: TokenUsage) -> Self {
        self.provider = Some((provider.into(), model.into(), usage));
        self
    }

    /// Capital split evenly over `num_results` positions
    pub fn sizing(mut self, capital: f64, num_results: usize) -> Self {
        self.capital = capital;
        self.num_results = num_results;
        self
    }

    pub fn volatility(mut self, volatility_pct: Option<f64>) -> Self {
        self.volatility_pct = volatility_pct;
        self
    }

    pub fn bands(mut self, bands: RiskBands) -> Self {
        self.bands = bands;
        self
    }

    pub fn build(self) -> GlassBox {
        let trade = self.trade;
        let factors = if trade.confidence_factors.is_empty() {
            derived_factors(trade, &self.report)
        } else {
            trade.confidence_factors.clone()
        };
        let (provider, model, token_usage) = match self.provider {
            Some((p, m, u)) => (Some(p), Some(m), Some(u)),
            None => (None, None, None),
        };

        GlassBox {
            reasoning: Reasoning {
                summary: self.reasoning.unwrap_or_else(|| trade.reasoning.clone()),
                market_analysis: trade.market_analysis.clone(),
                timeframe: trade.timeframe.clone(),
            },
            matched_criteria: trade.matched_criteria.clone(),
            confidence: ConfidenceBreakdown::new(factors),
            validation: self.report,
            risk: RiskMetrics::compute(
                trade,
                self.capital,
                self.num_results,
                self.volatility_pct,
                &self.bands,
            ),
            audit: AuditTrail {
                execution_id: self.telemetry.execution_id.clone(),
                provider,
                model,
                token_usage,
                generated_at: self.telemetry.started_at,
                telemetry: self.telemetry,
            },
        }
    }

    /// Build and attach to a copy of the trade
    pub fn enrich(self) -> EnrichedTrade {
        let trade = self.trade.clone();
        EnrichedTrade {
            trade,
            glass_box: self.build(),
        }
    }
}
