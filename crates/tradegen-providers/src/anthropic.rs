//! Anthropic Messages API
//!
//! `x-api-key` header plus a pinned `anthropic-version`; the system prompt is
//! a top-level field rather than a message.
use crate::error::ProviderError;
use crate::provider::{
    post_json, token_count, AiProvider, GenerateRequest, ProviderInfo, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tradegen_core::{ProviderResponse, TokenUsage};

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<UserMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicProvider {
    pub const NAME: &'static str = "anthropic";
    pub const DEFAULT_MODEL: &'static str = "claude-3-5-sonnet-latest";

    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_body(&self, request: &GenerateRequest<'_>) -> MessagesRequest {
        MessagesRequest {
            model: request
                .options
                .model
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            system: request.system_prompt.to_string(),
            messages: vec![UserMessage {
                role: "user",
                content: request.user_prompt.to_string(),
            }],
            max_tokens: request.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }

    /// Concatenate every `text` block of `content`
    pub fn parse_response(&self, raw: Value, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let blocks = raw
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::MalformedResponse("missing field '/content'".into()))?;
        let content: String = blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "response carried no text blocks".into(),
            ));
        }

        Ok(ProviderResponse {
            provider: Self::NAME.to_string(),
            model: raw
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(requested_model)
                .to_string(),
            content,
            usage: TokenUsage {
                input_tokens: token_count(&raw, "/usage/input_tokens"),
                output_tokens: token_count(&raw, "/usage/output_tokens"),
            },
            raw,
        })
    }
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: Self::NAME.to_string(),
            display_name: "Anthropic Claude".to_string(),
            default_model: Self::DEFAULT_MODEL.to_string(),
            supports_system_prompt: true,
        }
    }

    fn validate_api_key(&self, key: &str) -> bool {
        let key = key.trim();
        key.starts_with("sk-ant-") && key.len() >= 30
    }

    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ProviderResponse, ProviderError> {
        if !self.validate_api_key(request.api_key.expose()) {
            return Err(ProviderError::InvalidApiKey {
                provider: Self::NAME.to_string(),
            });
        }

        let body = self.request_body(&request);
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(request.api_key.expose().trim()).map_err(|_| {
                ProviderError::InvalidApiKey {
                    provider: Self::NAME.to_string(),
                }
            })?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        tracing::debug!(provider = Self::NAME, model = %body.model, "sending messages request");
        let url = format!("{}/v1/messages", self.base_url);
        let raw = post_json(&self.client, &url, headers, &body).await?;
        self.parse_response(raw, &body.model)
    }
}
