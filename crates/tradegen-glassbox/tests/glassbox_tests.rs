use proptest::prelude::*;
use tradegen_core::telemetry::Telemetry;
use tradegen_core::{ConfidenceFactor, Direction, TokenUsage, Trade};
use tradegen_glassbox::{weighted_total, GlassBoxBuilder, RiskLevel};
use tradegen_validation::{
    MarketQuote, TradeValidator, ValidationContext, ValidationProfile, ValidationReport,
};

fn trade() -> Trade {
    Trade {
        id: "sol-1".into(),
        asset: "SOLUSDT".into(),
        direction: Direction::Short,
        entry_price: 150.0,
        take_profit: 138.0,
        stop_loss: 154.0,
        leverage: 4.0,
        confidence: 74.0,
        timeframe: Some("1d".into()),
        reasoning: "Lower high under resistance".into(),
        market_analysis: Some("Funding positive, momentum fading".into()),
        matched_criteria: vec!["lower high".into(), "bearish divergence".into()],
        confidence_factors: vec![],
    }
}

fn report(t: &Trade) -> ValidationReport {
    let ctx = ValidationContext::new(ValidationProfile::balanced())
        .with_quotes([MarketQuote::new("SOLUSDT", 149.5).with_volume(400_000_000.0)]);
    TradeValidator::standard().validate(t, &ctx)
}

#[test]
fn test_build_full_glass_box() {
    let t = trade();
    let telemetry = Telemetry::new("exec-42");
    let summary = telemetry.summary();

    let glass_box = GlassBoxBuilder::new(&t, report(&t), summary.clone())
        .provider("anthropic", "claude-3-5-sonnet-latest", TokenUsage { input_tokens: 900, output_tokens: 300 })
        .sizing(6_000.0, 3)
        .volatility(Some(6.0))
        .build();

    assert_eq!(glass_box.reasoning.summary, "Lower high under resistance");
    assert_eq!(glass_box.matched_criteria.len(), 2);
    assert_eq!(glass_box.confidence.factors.len(), 3);
    assert!(glass_box.validation.usable);
    assert_eq!(glass_box.validation.passed, 6);
    assert_eq!(glass_box.risk.margin, 2_000.0);
    assert_eq!(glass_box.risk.risk_reward, 3.0);
    // leverage 4x is medium, 6% volatility is high
    assert_eq!(glass_box.risk.risk_level, RiskLevel::High);
    assert_eq!(glass_box.audit.execution_id, "exec-42");
    assert_eq!(glass_box.audit.generated_at, summary.started_at);
    assert_eq!(glass_box.audit.token_usage.map(|u| u.total()), Some(1_200));
}

#[test]
fn test_derived_confidence_total() {
    let t = trade();
    let glass_box = GlassBoxBuilder::new(&t, report(&t), Telemetry::new("x").summary()).build();
    // 50×74 + 25×100 (rr 3.0) + 25×100 (all passed), over 100
    assert!((glass_box.confidence.total - 87.0).abs() < 1e-9);
}

#[test]
fn test_model_factors_are_kept() {
    let mut t = trade();
    t.confidence_factors = vec![
        ConfidenceFactor::new("structure", 70.0, 90.0),
        ConfidenceFactor::new("funding", 30.0, 40.0),
    ];
    let glass_box = GlassBoxBuilder::new(&t, report(&t), Telemetry::new("x").summary()).build();
    assert_eq!(glass_box.confidence.factors, t.confidence_factors);
    assert!((glass_box.confidence.total - 75.0).abs() < 1e-9);
}

#[test]
fn test_build_is_deterministic() {
    let t = trade();
    let summary = Telemetry::new("x").summary();
    let a = GlassBoxBuilder::new(&t, report(&t), summary.clone()).sizing(1_000.0, 2).build();
    let b = GlassBoxBuilder::new(&t, report(&t), summary).sizing(1_000.0, 2).build();
    assert_eq!(a, b);
}

#[test]
fn test_enriched_trade_shape() {
    let t = trade();
    let enriched = GlassBoxBuilder::new(&t, report(&t), Telemetry::new("x").summary()).enrich();
    let json = serde_json::to_value(&enriched).unwrap();
    assert_eq!(json["asset"], "SOLUSDT");
    assert_eq!(json["direction"], "short");
    assert!(json["glassBox"]["confidence"]["total"].is_number());
    assert_eq!(json["glassBox"]["risk"]["riskLevel"], "medium");
    assert!(enriched.is_usable());
}

fn factor() -> impl Strategy<Value = ConfidenceFactor> {
    (0.0f64..100.0, -20.0f64..120.0).prop_map(|(weight, score)| ConfidenceFactor::new("f", weight, score))
}

proptest! {
    #[test]
    fn test_total_independent_of_order(
        factors in proptest::collection::vec(factor(), 0..10),
        seed in any::<u64>(),
    ) {
        let mut shuffled = factors.clone();
        // deterministic rotation + reversal driven by the seed
        if !shuffled.is_empty() {
            let k = (seed as usize) % shuffled.len();
            shuffled.rotate_left(k);
        }
        if seed % 2 == 0 {
            shuffled.reverse();
        }
        prop_assert_eq!(weighted_total(&factors), weighted_total(&shuffled));
    }

    #[test]
    fn test_total_within_bounds(factors in proptest::collection::vec(factor(), 0..10)) {
        let total = weighted_total(&factors);
        prop_assert!((0.0..=100.0).contains(&total));
    }
}
