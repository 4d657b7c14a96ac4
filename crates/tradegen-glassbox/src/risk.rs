//! Position sizing and qualitative risk level

use serde::{Deserialize, Serialize};
use tradegen_core::Trade;

/// Qualitative risk of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
    Extreme = 3,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Extreme => write!(f, "EXTREME"),
        }
    }
}

/// Upper bounds (inclusive) of the low, medium and high bands; anything
/// above the last is extreme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Thresholds {
    fn level(&self, value: f64) -> RiskLevel {
        if value <= self.low {
            RiskLevel::Low
        } else if value <= self.medium {
            RiskLevel::Medium
        } else if value <= self.high {
            RiskLevel::High
        } else {
            RiskLevel::Extreme
        }
    }
}

/// Leverage and 24h-volatility band table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBands {
    pub leverage: Thresholds,
    /// Percent of price
    pub volatility_pct: Thresholds,
}

impl Default for RiskBands {
    fn default() -> Self {
        Self {
            leverage: Thresholds {
                low: 3.0,
                medium: 10.0,
                high: 25.0,
            },
            volatility_pct: Thresholds {
                low: 2.0,
                medium: 5.0,
                high: 10.0,
            },
        }
    }
}

impl RiskBands {
    /// The worse of the leverage band and the volatility band
    pub fn classify(&self, leverage: f64, volatility_pct: Option<f64>) -> RiskLevel {
        let by_leverage = self.leverage.level(leverage);
        let by_volatility = volatility_pct
            .map(|v| self.volatility_pct.level(v))
            .unwrap_or_default();
        by_leverage.max(by_volatility)
    }
}

/// Sizing for one trade out of an equal split of capital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    /// Reward / risk; 0 when the stop sits on the entry
    pub risk_reward: f64,
    /// Capital allotted to this trade
    pub margin: f64,
    /// Margin × leverage
    pub notional: f64,
    pub quantity: f64,
    /// Loss if the stop is hit
    pub max_loss: f64,
    /// Profit if the target is hit
    pub potential_profit: f64,
    /// Max loss as a percent of margin
    pub loss_pct_of_margin: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_pct: Option<f64>,
    pub risk_level: RiskLevel,
}

impl RiskMetrics {
    pub fn compute(
        trade: &Trade,
        capital: f64,
        num_results: usize,
        volatility_pct: Option<f64>,
        bands: &RiskBands,
    ) -> Self {
        let margin = capital.max(0.0) / num_results.max(1) as f64;
        let notional = margin * trade.leverage.max(0.0);
        let quantity = if trade.entry_price > 0.0 {
            notional / trade.entry_price
        } else {
            0.0
        };
        let max_loss = quantity * trade.risk();
        Self {
            risk_reward: trade.risk_reward().unwrap_or(0.0),
            margin,
            notional,
            quantity,
            max_loss,
            potential_profit: quantity * trade.reward(),
            loss_pct_of_margin: if margin > 0.0 { max_loss / margin * 100.0 } else { 0.0 },
            volatility_pct,
            risk_level: bands.classify(trade.leverage, volatility_pct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradegen_core::Direction;

    fn trade(leverage: f64) -> Trade {
        Trade {
            id: "t".into(),
            asset: "ETHUSDT".into(),
            direction: Direction::Long,
            entry_price: 2_000.0,
            take_profit: 2_200.0,
            stop_loss: 1_900.0,
            leverage,
            confidence: 70.0,
            timeframe: None,
            reasoning: String::new(),
            market_analysis: None,
            matched_criteria: vec![],
            confidence_factors: vec![],
        }
    }

    #[test]
    fn test_bands() {
        let bands = RiskBands::default();
        assert_eq!(bands.classify(2.0, None), RiskLevel::Low);
        assert_eq!(bands.classify(3.0, Some(1.0)), RiskLevel::Low);
        assert_eq!(bands.classify(5.0, Some(1.0)), RiskLevel::Medium);
        assert_eq!(bands.classify(2.0, Some(7.5)), RiskLevel::High);
        assert_eq!(bands.classify(50.0, Some(0.5)), RiskLevel::Extreme);
    }

    #[test]
    fn test_sizing() {
        let m = RiskMetrics::compute(&trade(5.0), 3_000.0, 3, None, &RiskBands::default());
        assert_eq!(m.margin, 1_000.0);
        assert_eq!(m.notional, 5_000.0);
        assert_eq!(m.quantity, 2.5);
        assert_eq!(m.max_loss, 250.0);
        assert_eq!(m.potential_profit, 500.0);
        assert_eq!(m.loss_pct_of_margin, 25.0);
        assert_eq!(m.risk_reward, 2.0);
        assert_eq!(m.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_zero_results_does_not_divide_by_zero() {
        let m = RiskMetrics::compute(&trade(1.0), 1_000.0, 0, None, &RiskBands::default());
        assert_eq!(m.margin, 1_000.0);
    }
}
