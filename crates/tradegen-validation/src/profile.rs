//! Validation profiles
//!
//! Thresholds for every rule, with conservative / balanced / aggressive presets.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use tradegen_core::GenerationConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationProfile {
    /// Profile name (e.g. "balanced@1.0")
    pub name: String,

    /// Minimum reward / risk ratio
    pub min_risk_reward: f64,

    /// Minimum model confidence, 0-100
    pub min_confidence: f64,

    /// Leverage ceiling
    pub max_leverage: f64,

    /// Largest allowed distance of entry from the live price, in percent
    pub max_entry_deviation_pct: f64,

    /// Minimum 24h quote volume
    pub min_volume_24h: f64,
}

impl ValidationProfile {
    pub fn conservative() -> Self {
        Self {
            name: "conservative@1.0".to_string(),
            min_risk_reward: 2.0,
            min_confidence: 75.0,
            max_leverage: 5.0,
            max_entry_deviation_pct: 1.0,
            min_volume_24h: 50_000_000.0,
        }
    }

    pub fn balanced() -> Self {
        Self {
            name: "balanced@1.0".to_string(),
            min_risk_reward: 1.5,
            min_confidence: 60.0,
            max_leverage: 20.0,
            max_entry_deviation_pct: 2.0,
            min_volume_24h: 10_000_000.0,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            name: "aggressive@1.0".to_string(),
            min_risk_reward: 1.0,
            min_confidence: 50.0,
            max_leverage: 50.0,
            max_entry_deviation_pct: 5.0,
            min_volume_24h: 1_000_000.0,
        }
    }

    /// Load and check a profile from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let profile: Self = serde_yaml::from_str(yaml)?;
        profile.check()?;
        Ok(profile)
    }

    /// Get profile by mode name
    pub fn for_mode(mode: &str) -> Self {
        match mode.trim().to_ascii_lowercase().as_str() {
            "conservative" => Self::conservative(),
            "aggressive" => Self::aggressive(),
            _ => Self::balanced(),
        }
    }

    /// Tighten the thresholds with the caller's settings. A request can raise
    /// the confidence floor or lower the leverage ceiling, never the reverse.
    pub fn with_request(mut self, config: &GenerationConfig) -> Self {
        if config.min_confidence.is_finite() {
            self.min_confidence = self.min_confidence.max(config.min_confidence.min(100.0));
        }
        if config.leverage.is_finite() {
            self.max_leverage = self.max_leverage.min(config.leverage.max(1.0));
        }
        self
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        let bounds: [(&'static str, f64, bool, &'static str); 5] = [
            ("min_risk_reward", self.min_risk_reward, self.min_risk_reward >= 0.0, ">= 0"),
            (
                "min_confidence",
                self.min_confidence,
                (0.0..=100.0).contains(&self.min_confidence),
                "within 0..=100",
            ),
            ("max_leverage", self.max_leverage, self.max_leverage >= 1.0, ">= 1"),
            (
                "max_entry_deviation_pct",
                self.max_entry_deviation_pct,
                self.max_entry_deviation_pct > 0.0,
                "> 0",
            ),
            ("min_volume_24h", self.min_volume_24h, self.min_volume_24h >= 0.0, ">= 0"),
        ];
        for (field, value, ok, expected) in bounds {
            if !ok || !value.is_finite() {
                return Err(ConfigError::OutOfRange {
                    field,
                    expected,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for ValidationProfile {
    fn default() -> Self {
        Self::balanced()
    }
}
