//! The standard pipeline end to end, with a scripted provider and fixed prices
use async_trait::async_trait;
use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tradegen_core::{
    ExecutionStatus, GenerationConfig, PipelineConfig, PipelineError, PipelineInput,
    ProviderResponse, RetryPolicy, Strategy, TokenUsage,
};
use tradegen_providers::{AiProvider, GenerateRequest, ProviderError, ProviderInfo, ProviderRegistry};
use tradegen_stages::keys::{FINAL, MARKET_CONTEXT, PRICES};
use tradegen_stages::{
    standard_pipeline, GenerationOutcome, HttpPriceSource, PipelineDeps, PriceError, PriceSource,
    StaticPriceSource,
};
use tradegen_validation::MarketQuote;

const KEY: &str = "scripted-key-0123456789";

struct ScriptedProvider {
    content: String,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "scripted".into(),
            display_name: "Scripted".into(),
            default_model: "script-1".into(),
            supports_system_prompt: true,
        }
    }

    fn validate_api_key(&self, key: &str) -> bool {
        key == KEY
    }

    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.validate_api_key(request.api_key.expose()) {
            return Err(ProviderError::InvalidApiKey {
                provider: "scripted".into(),
            });
        }
        Ok(ProviderResponse {
            provider: "scripted".into(),
            model: "script-1".into(),
            content: self.content.clone(),
            usage: TokenUsage {
                input_tokens: request.user_prompt.len() as u64,
                output_tokens: 42,
            },
            raw: json!({ "echo": request.system_prompt.len() }),
        })
    }
}

struct DownPrices;

#[async_trait]
impl PriceSource for DownPrices {
    fn name(&self) -> &str {
        "down"
    }

    async fn fetch(&self, _symbols: &[String]) -> Result<Vec<MarketQuote>, PriceError> {
        Err(PriceError::Http {
            status: 418,
            message: "teapot".into(),
        })
    }
}

fn quotes() -> Vec<MarketQuote> {
    vec![
        MarketQuote::new("BTCUSDT", 64_000.0)
            .with_range(63_000.0, 65_000.0)
            .with_volume(900_000_000.0),
        MarketQuote::new("ETHUSDT", 3_000.0)
            .with_range(2_950.0, 3_050.0)
            .with_volume(400_000_000.0),
    ]
}

const THREE_TRADES: &str = r#"```json
[
  {"asset":"BTCUSDT","direction":"long","entryPrice":64100,"takeProfit":66500,"stopLoss":63300,
   "leverage":3,"confidence":81,"reasoning":"Range breakout","matchedCriteria":["breakout"]},
  {"asset":"ETHUSDT","direction":"short","entryPrice":3000,"takeProfit":2850,"stopLoss":3060,
   "leverage":2,"confidence":66,"reasoning":"Rejection at resistance"},
  {"asset":"ETHUSDT","direction":"long","entryPrice":3000,"takeProfit":3010,"stopLoss":2900,
   "leverage":2,"confidence":90,"reasoning":"Poor reward"}
]
```"#;

fn fast() -> PipelineConfig {
    PipelineConfig {
        retry: RetryPolicy {
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
        ..Default::default()
    }
}

fn deps(content: &str, prices: Arc<dyn PriceSource>) -> (PipelineDeps, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ProviderRegistry::new();
    registry.register(ScriptedProvider {
        content: content.to_string(),
        calls: calls.clone(),
    });
    let deps = PipelineDeps::new(Arc::new(registry), prices).with_config(fast());
    (deps, calls)
}

fn input(provider: &str, key: &str) -> PipelineInput {
    let mut config = GenerationConfig::new(provider, key);
    config.capital = 9_000.0;
    config.leverage = 5.0;
    config.min_confidence = 60.0;
    config.num_results = 3;
    config.assets = vec!["BTCUSDT".into(), "ETHUSDT".into()];
    PipelineInput::new(Strategy::new("Breakouts", "Trade clean range breaks"), config)
}

#[tokio::test]
async fn test_standard_pipeline_happy_path() {
    let (deps, calls) = deps(THREE_TRADES, Arc::new(StaticPriceSource::new(quotes())));
    let runner = standard_pipeline(&deps).unwrap();

    let ctx = runner.execute(input("scripted", KEY)).await;

    assert!(ctx.is_success(), "{:?}", ctx.error());
    assert_eq!(
        ctx.results().keys(),
        vec![
            "fetchPrices",
            "buildMarketContext",
            "generatePrompt",
            "callAIProvider",
            "parseResponse",
            "validateTrades",
            "enrichGlassBox"
        ]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let result = ctx.results().get(&FINAL).unwrap();
    assert_eq!(result.summary.generated, 3);
    assert_eq!(result.summary.valid, 2);
    assert_eq!(result.summary.invalid, 1);
    assert_eq!(result.summary.outcome, GenerationOutcome::Partial);
    assert_eq!(result.invalid_trades[0].trade.reasoning, "Poor reward");
    assert!(!result.invalid_trades[0].is_usable());

    // sorted by glass box confidence, highest first
    assert_eq!(result.trades[0].trade.asset, "BTCUSDT");
    assert!(result.trades[0].confidence() >= result.trades[1].confidence());

    let glass_box = &result.trades[0].glass_box;
    assert_eq!(glass_box.risk.margin, 3_000.0);
    assert_eq!(glass_box.audit.provider.as_deref(), Some("scripted"));
    assert_eq!(glass_box.audit.execution_id, ctx.execution_id());
    assert_eq!(result.glass_box_data.token_usage.map(|u| u.output_tokens), Some(42));
    assert!(result.glass_box_data.live_market_data);
}

#[tokio::test]
async fn test_truncates_to_requested() {
    let (deps, _) = deps(THREE_TRADES, Arc::new(StaticPriceSource::new(quotes())));
    let runner = standard_pipeline(&deps).unwrap();
    let mut input = input("scripted", KEY);
    input.config.num_results = 1;

    let ctx = runner.execute(input).await;
    let result = ctx.results().get(&FINAL).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.summary.truncated, 1);
    assert_eq!(result.summary.outcome, GenerationOutcome::Complete);
}

#[tokio::test]
async fn test_prose_answer_is_provider_returned_nothing() {
    let (deps, _) = deps("Sorry, markets are unpredictable.", Arc::new(StaticPriceSource::new(quotes())));
    let ctx = standard_pipeline(&deps).unwrap().execute(input("scripted", KEY)).await;

    assert!(ctx.is_success());
    let result = ctx.results().get(&FINAL).unwrap();
    assert!(result.trades.is_empty());
    assert_eq!(result.summary.outcome, GenerationOutcome::ProviderReturnedNothing);
}

#[tokio::test]
async fn test_everything_filtered() {
    let answer = r#"[{"asset":"BTCUSDT","direction":"long","entryPrice":64000,"takeProfit":64100,"stopLoss":63000,"confidence":20}]"#;
    let (deps, _) = deps(answer, Arc::new(StaticPriceSource::new(quotes())));
    let ctx = standard_pipeline(&deps).unwrap().execute(input("scripted", KEY)).await;

    let result = ctx.results().get(&FINAL).unwrap();
    assert_eq!(result.summary.outcome, GenerationOutcome::AllFiltered);
    assert_eq!(result.invalid_trades.len(), 1);
}

#[tokio::test]
async fn test_price_outage_is_tolerated() {
    let (deps, _) = deps(THREE_TRADES, Arc::new(DownPrices));
    let ctx = standard_pipeline(&deps).unwrap().execute(input("scripted", KEY)).await;

    assert!(ctx.is_success());
    assert!(ctx.error().is_none());
    assert_eq!(ctx.failed_steps(), ["fetchPrices".to_string()]);
    // a 4xx from the price API is not retried
    assert_eq!(ctx.attempts("fetchPrices"), 1);
    assert!(!ctx.results().contains(PRICES.name()));

    let market = ctx.results().get(&MARKET_CONTEXT).unwrap();
    assert!(!market.live_data);
    assert_eq!(market.missing, vec!["BTCUSDT", "ETHUSDT"]);
    let result = ctx.results().get(&FINAL).unwrap();
    assert!(!result.glass_box_data.live_market_data);
    assert_eq!(result.summary.valid, 2);
}

#[tokio::test]
async fn test_unknown_provider_aborts_without_retry() {
    let (deps, calls) = deps(THREE_TRADES, Arc::new(StaticPriceSource::new(quotes())));
    let ctx = standard_pipeline(&deps).unwrap().execute(input("mistral", KEY)).await;

    assert_eq!(ctx.status(), ExecutionStatus::Failed);
    let failure = ctx.error().unwrap();
    assert_eq!(failure.step.as_deref(), Some("callAIProvider"));
    assert!(matches!(failure.error, PipelineError::Provider { .. }));
    assert_eq!(ctx.attempts("callAIProvider"), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!ctx.results().contains("parseResponse"));
}

#[tokio::test]
async fn test_rejected_key_is_not_retried_or_leaked() {
    let (deps, calls) = deps(THREE_TRADES, Arc::new(StaticPriceSource::new(quotes())));
    let ctx = standard_pipeline(&deps)
        .unwrap()
        .execute(input("scripted", "wrong-key-abcdefgh"))
        .await;

    assert_eq!(ctx.status(), ExecutionStatus::Failed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let view = serde_json::to_string(&ctx.view()).unwrap();
    assert!(!view.contains("wrong-key-abcdefgh"));
    let export = ctx.telemetry().export().to_json().unwrap();
    assert!(!export.contains("wrong-key-abcdefgh"));
}

#[tokio::test]
async fn test_http_price_source() {
    let app = Router::new().route(
        "/api/v3/ticker/24hr",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let symbols: Vec<String> = serde_json::from_str(&params["symbols"]).unwrap_or_default();
            let tickers: Vec<Value> = symbols
                .iter()
                .map(|s| {
                    json!({
                        "symbol": s, "lastPrice": "100.5", "priceChangePercent": "2.0",
                        "highPrice": "105", "lowPrice": "95", "quoteVolume": "12345678"
                    })
                })
                .collect();
            Json(tickers)
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let source = HttpPriceSource::with_base_url(reqwest::Client::new(), format!("http://{addr}"));
    let quotes = source
        .fetch(&["btc/usdt".to_string(), "ETHUSDT".to_string()])
        .await
        .unwrap();

    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].symbol, "BTCUSDT");
    assert_eq!(quotes[1].price, 100.5);
    assert!((quotes[1].volatility_pct() - 10.0 / 100.5 * 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_http_price_source_error_message() {
    let app = Router::new().route(
        "/api/v3/ticker/24hr",
        get(|| async {
            (
                axum::http::StatusCode::BAD_REQUEST,
                Json(json!({ "code": -1121, "msg": "Invalid symbol." })),
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let source = HttpPriceSource::with_base_url(reqwest::Client::new(), format!("http://{addr}"));
    let err = source.fetch(&["NOPE".to_string()]).await.unwrap_err();
    assert_eq!(
        err,
        PriceError::Http {
            status: 400,
            message: "Invalid symbol.".into()
        }
    );
}
