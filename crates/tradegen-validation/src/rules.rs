//! The individual trade rules
//!
//! Each rule is pure: `(trade, context) -> verdict`, independent of the others.

use crate::market::ValidationContext;
use crate::verdict::{Severity, ValidationVerdict};
use tradegen_core::{Direction, Trade};

/// One composable check
pub trait Validator: Send + Sync {
    /// Stable rule identifier
    fn name(&self) -> &'static str;

    fn severity(&self) -> Severity;

    fn check(&self, trade: &Trade, ctx: &ValidationContext) -> ValidationVerdict;
}

/// Reward / risk must reach `min_risk_reward`
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskRewardRule;

impl Validator for RiskRewardRule {
    fn name(&self) -> &'static str {
        "risk_reward"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, trade: &Trade, ctx: &ValidationContext) -> ValidationVerdict {
        let min = ctx.profile.min_risk_reward;
        match trade.risk_reward() {
            None => ValidationVerdict::fail(self.name(), self.severity(), "stop loss sits on the entry price"),
            Some(rr) if rr < min => ValidationVerdict::fail(
                self.name(),
                self.severity(),
                format!("risk:reward 1:{:.2} below minimum 1:{:.2}", rr, min),
            )
            .measured(rr, min),
            Some(rr) => ValidationVerdict::pass(
                self.name(),
                self.severity(),
                format!("risk:reward 1:{:.2}", rr),
            )
            .measured(rr, min),
        }
    }
}

/// Entry must lie strictly between stop loss and take profit, on the side
/// matching the direction
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceBoundsRule;

impl Validator for PriceBoundsRule {
    fn name(&self) -> &'static str {
        "price_bounds"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, trade: &Trade, _ctx: &ValidationContext) -> ValidationVerdict {
        let prices = [trade.entry_price, trade.take_profit, trade.stop_loss];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return ValidationVerdict::fail(self.name(), self.severity(), "prices must be positive");
        }

        let ordered = match trade.direction {
            Direction::Long => trade.stop_loss < trade.entry_price && trade.entry_price < trade.take_profit,
            Direction::Short => trade.take_profit < trade.entry_price && trade.entry_price < trade.stop_loss,
        };
        let expected = match trade.direction {
            Direction::Long => "stop < entry < target",
            Direction::Short => "target < entry < stop",
        };
        if ordered {
            ValidationVerdict::pass(self.name(), self.severity(), expected)
        } else {
            ValidationVerdict::fail(
                self.name(),
                self.severity(),
                format!(
                    "expected {} (entry {}, target {}, stop {})",
                    expected, trade.entry_price, trade.take_profit, trade.stop_loss
                ),
            )
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceRule;

impl Validator for ConfidenceRule {
    fn name(&self) -> &'static str {
        "min_confidence"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, trade: &Trade, ctx: &ValidationContext) -> ValidationVerdict {
        let min = ctx.profile.min_confidence;
        let verdict = if trade.confidence >= min {
            ValidationVerdict::pass(self.name(), self.severity(), format!("confidence {:.0}%", trade.confidence))
        } else {
            ValidationVerdict::fail(
                self.name(),
                self.severity(),
                format!("confidence {:.0}% below minimum {:.0}%", trade.confidence, min),
            )
        };
        verdict.measured(trade.confidence, min)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LeverageRule;

impl Validator for LeverageRule {
    fn name(&self) -> &'static str {
        "max_leverage"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, trade: &Trade, ctx: &ValidationContext) -> ValidationVerdict {
        let max = ctx.profile.max_leverage;
        let verdict = if trade.leverage <= 0.0 {
            ValidationVerdict::fail(self.name(), self.severity(), "leverage must be positive")
        } else if trade.leverage > max {
            ValidationVerdict::fail(
                self.name(),
                self.severity(),
                format!("leverage {}x exceeds ceiling {}x", trade.leverage, max),
            )
        } else {
            ValidationVerdict::pass(self.name(), self.severity(), format!("leverage {}x", trade.leverage))
        };
        verdict.measured(trade.leverage, max)
    }
}

/// Entry should be near the live price. Passes when no live price is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryDeviationRule;

impl Validator for EntryDeviationRule {
    fn name(&self) -> &'static str {
        "entry_deviation"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, trade: &Trade, ctx: &ValidationContext) -> ValidationVerdict {
        let max = ctx.profile.max_entry_deviation_pct;
        let Some(quote) = ctx.quote(&trade.asset).filter(|q| q.price > 0.0) else {
            return ValidationVerdict::pass(
                self.name(),
                self.severity(),
                format!("no live price for {}", trade.asset),
            );
        };

        let deviation = (trade.entry_price - quote.price).abs() / quote.price * 100.0;
        let verdict = if deviation > max {
            ValidationVerdict::fail(
                self.name(),
                self.severity(),
                format!("entry {:.2}% away from live price {}", deviation, quote.price),
            )
        } else {
            ValidationVerdict::pass(
                self.name(),
                self.severity(),
                format!("entry within {:.2}% of live price", deviation),
            )
        };
        verdict.measured(deviation, max)
    }
}

/// Liquidity floor. Passes when no volume is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeRule;

impl Validator for VolumeRule {
    fn name(&self) -> &'static str {
        "min_volume"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, trade: &Trade, ctx: &ValidationContext) -> ValidationVerdict {
        let min = ctx.profile.min_volume_24h;
        let Some(volume) = ctx
            .quote(&trade.asset)
            .map(|q| q.volume_24h)
            .filter(|v| *v > 0.0)
        else {
            return ValidationVerdict::pass(
                self.name(),
                self.severity(),
                format!("no volume data for {}", trade.asset),
            );
        };

        let verdict = if volume < min {
            ValidationVerdict::fail(
                self.name(),
                self.severity(),
                format!("24h volume {:.0} below {:.0}", volume, min),
            )
        } else {
            ValidationVerdict::pass(self.name(), self.severity(), format!("24h volume {:.0}", volume))
        };
        verdict.measured(volume, min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketQuote;
    use crate::profile::ValidationProfile;

    fn long(entry: f64, tp: f64, sl: f64) -> Trade {
        Trade {
            id: "t1".into(),
            asset: "BTCUSDT".into(),
            direction: Direction::Long,
            entry_price: entry,
            take_profit: tp,
            stop_loss: sl,
            leverage: 5.0,
            confidence: 72.0,
            timeframe: None,
            reasoning: String::new(),
            market_analysis: None,
            matched_criteria: vec![],
            confidence_factors: vec![],
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext::new(ValidationProfile::balanced())
            .with_quotes([MarketQuote::new("BTCUSDT", 100.0).with_volume(20_000_000.0)])
    }

    #[test]
    fn test_risk_reward() {
        let ok = RiskRewardRule.check(&long(100.0, 106.0, 98.0), &ctx());
        assert!(ok.passed);
        assert_eq!(ok.value, Some(3.0));

        let bad = RiskRewardRule.check(&long(100.0, 101.0, 98.0), &ctx());
        assert!(bad.is_blocking());

        let flat = RiskRewardRule.check(&long(100.0, 101.0, 100.0), &ctx());
        assert!(!flat.passed);
    }

    #[test]
    fn test_price_bounds_by_direction() {
        assert!(PriceBoundsRule.check(&long(100.0, 110.0, 95.0), &ctx()).passed);
        assert!(!PriceBoundsRule.check(&long(100.0, 95.0, 110.0), &ctx()).passed);

        let mut short = long(100.0, 90.0, 105.0);
        short.direction = Direction::Short;
        assert!(PriceBoundsRule.check(&short, &ctx()).passed);
        short.direction = Direction::Long;
        assert!(!PriceBoundsRule.check(&short, &ctx()).passed);

        assert!(!PriceBoundsRule.check(&long(0.0, 110.0, 95.0), &ctx()).passed);
    }

    #[test]
    fn test_confidence_and_leverage() {
        let mut trade = long(100.0, 110.0, 95.0);
        assert!(ConfidenceRule.check(&trade, &ctx()).passed);
        trade.confidence = 40.0;
        assert!(ConfidenceRule.check(&trade, &ctx()).is_blocking());

        assert!(LeverageRule.check(&trade, &ctx()).passed);
        trade.leverage = 25.0;
        let verdict = LeverageRule.check(&trade, &ctx());
        assert!(verdict.is_blocking());
        assert_eq!(verdict.threshold, Some(20.0));
    }

    #[test]
    fn test_entry_deviation_is_a_warning() {
        let far = EntryDeviationRule.check(&long(110.0, 130.0, 100.0), &ctx());
        assert!(!far.passed);
        assert!(!far.is_blocking());
        assert_eq!(far.severity, Severity::Warning);

        let near = EntryDeviationRule.check(&long(101.0, 110.0, 95.0), &ctx());
        assert!(near.passed);
    }

    #[test]
    fn test_missing_market_data_passes() {
        let mut trade = long(100.0, 110.0, 95.0);
        trade.asset = "DOGEUSDT".into();
        assert!(EntryDeviationRule.check(&trade, &ctx()).passed);
        assert!(VolumeRule.check(&trade, &ctx()).passed);
    }

    #[test]
    fn test_volume_floor() {
        let thin = ValidationContext::new(ValidationProfile::balanced())
            .with_quotes([MarketQuote::new("BTCUSDT", 100.0).with_volume(5_000.0)]);
        let verdict = VolumeRule.check(&long(100.0, 110.0, 95.0), &thin);
        assert!(!verdict.passed);
        assert_eq!(verdict.severity, Severity::Warning);
    }
}
