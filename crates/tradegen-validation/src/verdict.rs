//! Verdict types for trade validation
//!
//! One [`ValidationVerdict`] per (trade, rule) pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much a failing verdict matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Surfaced, never blocks
    Warning = 1,
    /// Makes the trade unusable
    Error = 2,
}

impl Severity {
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Outcome of one rule applied to one trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    /// Rule identifier (e.g. "risk_reward")
    pub rule: String,
    pub passed: bool,
    pub severity: Severity,
    pub message: String,
    /// Observed value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Limit the value was compared against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl ValidationVerdict {
    pub fn pass(rule: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            passed: true,
            severity,
            message: message.into(),
            value: None,
            threshold: None,
        }
    }

    pub fn fail(rule: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            ..Self::pass(rule, severity, message)
        }
    }

    /// Attach the observed value and the limit
    pub fn measured(mut self, value: f64, threshold: f64) -> Self {
        self.value = Some(value);
        self.threshold = Some(threshold);
        self
    }

    /// Failing with error severity
    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity.is_blocking()
    }
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "{} [{}] {}: {}", status, self.severity, self.rule, self.message)
    }
}
