//! Adapters against a local stand-in server
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tradegen_core::ApiKey;
use tradegen_providers::{
    AiProvider, AnthropicProvider, GeminiProvider, GenerateOptions, GenerateRequest,
    OpenAiProvider, ProviderError,
};

#[derive(Clone, Default)]
struct Recorder {
    hits: Arc<AtomicUsize>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl Recorder {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .lock()
            .unwrap()
            .last()
            .and_then(|h| h.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn last_body(&self) -> Value {
        self.bodies.lock().unwrap().last().cloned().unwrap_or(Value::Null)
    }
}

/// Serve `reply` on `path`, returning the base URL and a hit recorder
async fn serve(path: &'static str, status: StatusCode, reply: Value) -> (String, Recorder) {
    let recorder = Recorder::default();
    let state = (recorder.clone(), status, reply);
    let app = Router::new()
        .route(
            path,
            post(
                |State((rec, status, reply)): State<(Recorder, StatusCode, Value)>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    rec.hits.fetch_add(1, Ordering::SeqCst);
                    rec.headers.lock().unwrap().push(headers);
                    rec.bodies.lock().unwrap().push(body);
                    (status, Json(reply))
                },
            ),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), recorder)
}

fn request<'a>(key: &'a ApiKey) -> GenerateRequest<'a> {
    GenerateRequest {
        system_prompt: "You are a disciplined futures trader.",
        user_prompt: "Return trades as JSON.",
        api_key: key,
        options: GenerateOptions::default(),
    }
}

#[tokio::test]
async fn test_openai_success() {
    let (base, rec) = serve(
        "/v1/chat/completions",
        StatusCode::OK,
        json!({
            "model": "gpt-4o",
            "choices": [{ "message": { "content": "[{\"asset\":\"BTCUSDT\"}]" } }],
            "usage": { "prompt_tokens": 50, "completion_tokens": 12 }
        }),
    )
    .await;
    let provider = OpenAiProvider::openai(reqwest::Client::new()).with_base_url(base);
    let key = ApiKey::new("sk-test-abcdefghijklmnopqrstuvwxyz");

    let response = provider.generate(request(&key)).await.unwrap();

    assert_eq!(response.provider, "openai");
    assert_eq!(response.content, "[{\"asset\":\"BTCUSDT\"}]");
    assert_eq!(response.usage.total(), 62);
    assert_eq!(rec.hits(), 1);
    assert_eq!(
        rec.header("authorization").as_deref(),
        Some("Bearer sk-test-abcdefghijklmnopqrstuvwxyz")
    );
    assert_eq!(rec.last_body()["messages"][0]["role"], "system");
}

#[tokio::test]
async fn test_deepseek_path() {
    let (base, rec) = serve(
        "/chat/completions",
        StatusCode::OK,
        json!({ "choices": [{ "message": { "content": "[]" } }] }),
    )
    .await;
    let provider = OpenAiProvider::deepseek(reqwest::Client::new()).with_base_url(base);
    let key = ApiKey::new("sk-deepseek-abcdefghijklmnop");

    let response = provider.generate(request(&key)).await.unwrap();

    assert_eq!(response.provider, "deepseek");
    assert_eq!(response.model, "deepseek-chat");
    assert_eq!(response.usage.total(), 0);
    assert_eq!(rec.hits(), 1);
}

#[tokio::test]
async fn test_anthropic_headers() {
    let (base, rec) = serve(
        "/v1/messages",
        StatusCode::OK,
        json!({
            "content": [{ "type": "text", "text": "[]" }],
            "usage": { "input_tokens": 3, "output_tokens": 1 }
        }),
    )
    .await;
    let provider = AnthropicProvider::new(reqwest::Client::new()).with_base_url(base);
    let key = ApiKey::new("sk-ant-REDACTED");

    provider.generate(request(&key)).await.unwrap();

    assert_eq!(
        rec.header("x-api-key").as_deref(),
        Some("sk-ant-REDACTED")
    );
    assert_eq!(rec.header("anthropic-version").as_deref(), Some("2023-06-01"));
    assert_eq!(rec.last_body()["system"], "You are a disciplined futures trader.");
}

#[tokio::test]
async fn test_gemini_model_in_path() {
    let (base, rec) = serve(
        "/v1beta/models/gemini-1.5-flash:generateContent",
        StatusCode::OK,
        json!({
            "candidates": [{ "content": { "parts": [{ "text": "[]" }] } }],
            "usageMetadata": { "promptTokenCount": 4, "candidatesTokenCount": 1 }
        }),
    )
    .await;
    let provider = GeminiProvider::new(reqwest::Client::new()).with_base_url(base);
    let key = ApiKey::new("AIzaSyA-abcdefghijklmnopqrstuvwxyz");
    let mut req = request(&key);
    req.options.model = Some("gemini-1.5-flash".into());

    let response = provider.generate(req).await.unwrap();

    assert_eq!(response.model, "gemini-1.5-flash");
    assert_eq!(rec.header("x-goog-api-key").as_deref(), Some("AIzaSyA-abcdefghijklmnopqrstuvwxyz"));
    assert_eq!(rec.hits(), 1);
}

#[tokio::test]
async fn test_http_error_carries_provider_message() {
    let (base, _rec) = serve(
        "/v1/chat/completions",
        StatusCode::UNAUTHORIZED,
        json!({ "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" } }),
    )
    .await;
    let provider = OpenAiProvider::openai(reqwest::Client::new()).with_base_url(base);
    let key = ApiKey::new("sk-test-abcdefghijklmnopqrstuvwxyz");

    let err = provider.generate(request(&key)).await.unwrap_err();

    assert_eq!(
        err,
        ProviderError::Http {
            status: 401,
            message: "Incorrect API key provided".into()
        }
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_rate_limit_is_retryable() {
    let (base, _rec) = serve(
        "/v1/messages",
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "type": "error", "error": { "type": "rate_limit_error", "message": "slow down" } }),
    )
    .await;
    let provider = AnthropicProvider::new(reqwest::Client::new()).with_base_url(base);
    let key = ApiKey::new("sk-ant-REDACTED");

    let err = provider.generate(request(&key)).await.unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_invalid_key_fails_without_network() {
    let (base, rec) = serve("/v1/chat/completions", StatusCode::OK, json!({})).await;
    let provider = OpenAiProvider::openai(reqwest::Client::new()).with_base_url(base);
    let key = ApiKey::new("not-a-key");

    let err = provider.generate(request(&key)).await.unwrap_err();

    assert!(matches!(err, ProviderError::InvalidApiKey { .. }));
    assert_eq!(rec.hits(), 0);
}

#[tokio::test]
async fn test_gemini_without_candidates() {
    let (base, _rec) = serve(
        "/v1beta/models/gemini-1.5-pro:generateContent",
        StatusCode::OK,
        json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
    )
    .await;
    let provider = GeminiProvider::new(reqwest::Client::new()).with_base_url(base);
    let key = ApiKey::new("AIzaSyA-abcdefghijklmnopqrstuvwxyz");

    let err = provider.generate(request(&key)).await.unwrap_err();

    assert!(matches!(err, ProviderError::MalformedResponse(ref m) if m.contains("SAFETY")));
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let provider =
        OpenAiProvider::openai(reqwest::Client::new()).with_base_url("http://127.0.0.1:1");
    let key = ApiKey::new("sk-test-abcdefghijklmnopqrstuvwxyz");

    let err = provider.generate(request(&key)).await.unwrap_err();

    assert!(matches!(err, ProviderError::Transport(_)));
    assert!(err.is_retryable());
}
