//! # Glass Box
//!
//! Accumulates everything known about a generated trade into one
//! explanation value: reasoning, matched criteria, weighted confidence
//! factors, validation verdicts, risk metrics and the audit trail of the
//! execution that produced it.

pub mod builder;
pub mod confidence;
pub mod risk;

pub use builder::{AuditTrail, EnrichedTrade, GlassBox, GlassBoxBuilder, Reasoning};
pub use confidence::{derived_factors, weighted_total, ConfidenceBreakdown};
pub use risk::{RiskBands, RiskLevel, RiskMetrics, Thresholds};
