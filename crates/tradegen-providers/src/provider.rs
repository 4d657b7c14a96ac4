//! The provider contract and shared HTTP plumbing
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tradegen_core::{ApiKey, ProviderResponse};

/// Static description of an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Registry key (e.g. "openai")
    pub name: String,
    pub display_name: String,
    pub default_model: String,
    /// Whether the backend accepts a distinct system-role message
    pub supports_system_prompt: bool,
}

/// Per-call tuning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One `generate` call
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub api_key: &'a ApiKey,
    pub options: GenerateOptions,
}

/// Uniform contract over heterogeneous AI backends
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn info(&self) -> ProviderInfo;

    /// Cheap, format-only key check; no network
    fn validate_api_key(&self, key: &str) -> bool;

    /// Issue one completion request. Fails fast with
    /// [`ProviderError::InvalidApiKey`] before any network I/O when the key
    /// does not pass [`AiProvider::validate_api_key`].
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ProviderResponse, ProviderError>;
}

pub(crate) const DEFAULT_TEMPERATURE: f32 = 0.7;
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 4_096;

/// POST a JSON body and return the decoded JSON reply.
///
/// Non-2xx replies become [`ProviderError::Http`] carrying the
/// provider-reported message when one can be found in the body.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    body: &B,
) -> Result<Value, ProviderError> {
    let response = client.post(url).headers(headers).json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::Http {
            status: status.as_u16(),
            message: error_message(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
        });
    }

    serde_json::from_str(&text)
        .map_err(|e| ProviderError::MalformedResponse(format!("response is not JSON: {e}")))
}

/// Pull a human-readable message out of an error body.
///
/// Handles `{"error":{"message":..}}`, `{"error":".."}` and `{"message":..}`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("error").filter(|e| e.is_string()))
        .or_else(|| value.get("message"))?;
    message.as_str().map(str::to_string)
}

pub(crate) fn require_str<'v>(value: &'v Value, pointer: &str) -> Result<&'v str, ProviderError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::MalformedResponse(format!("missing field '{pointer}'")))
}

pub(crate) fn token_count(value: &Value, pointer: &str) -> u64 {
    value.pointer(pointer).and_then(Value::as_u64).unwrap_or(0)
}
