//! OpenAI-style chat completions (OpenAI, DeepSeek)
//!
//! Bearer auth, distinct system message, `usage.prompt_tokens` /
//! `usage.completion_tokens`.
use crate::error::ProviderError;
use crate::provider::{
    post_json, require_str, token_count, AiProvider, GenerateRequest, ProviderInfo,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use tradegen_core::{ProviderResponse, TokenUsage};

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Adapter for any backend speaking the OpenAI chat-completions dialect
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    name: &'static str,
    display_name: &'static str,
    base_url: String,
    path: &'static str,
    default_model: &'static str,
    key_prefix: &'static str,
    min_key_len: usize,
}

impl OpenAiProvider {
    /// api.openai.com, `gpt-4o`
    pub fn openai(client: reqwest::Client) -> Self {
        Self {
            client,
            name: "openai",
            display_name: "OpenAI",
            base_url: "https://api.openai.com".to_string(),
            path: "/v1/chat/completions",
            default_model: "gpt-4o",
            key_prefix: "sk-",
            min_key_len: 20,
        }
    }

    /// api.deepseek.com, `deepseek-chat`
    pub fn deepseek(client: reqwest::Client) -> Self {
        Self {
            client,
            name: "deepseek",
            display_name: "DeepSeek",
            base_url: "https://api.deepseek.com".to_string(),
            path: "/chat/completions",
            default_model: "deepseek-chat",
            key_prefix: "sk-",
            min_key_len: 20,
        }
    }

    /// Point at another host (proxies, local test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_body(&self, request: &GenerateRequest<'_>) -> ChatRequest {
        ChatRequest {
            model: request
                .options
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.to_string()),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: request.user_prompt.to_string(),
                },
            ],
            temperature: request.options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: request.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    pub fn parse_response(&self, raw: Value, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let content = require_str(&raw, "/choices/0/message/content")?.to_string();
        let model = raw
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(requested_model)
            .to_string();
        let usage = TokenUsage {
            input_tokens: token_count(&raw, "/usage/prompt_tokens"),
            output_tokens: token_count(&raw, "/usage/completion_tokens"),
        };
        Ok(ProviderResponse {
            provider: self.name.to_string(),
            model,
            content,
            usage,
            raw,
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name.to_string(),
            display_name: self.display_name.to_string(),
            default_model: self.default_model.to_string(),
            supports_system_prompt: true,
        }
    }

    fn validate_api_key(&self, key: &str) -> bool {
        let key = key.trim();
        key.starts_with(self.key_prefix) && key.len() >= self.min_key_len
    }

    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ProviderResponse, ProviderError> {
        if !self.validate_api_key(request.api_key.expose()) {
            return Err(ProviderError::InvalidApiKey {
                provider: self.name.to_string(),
            });
        }

        let body = self.request_body(&request);
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", request.api_key.expose().trim()))
            .map_err(|_| ProviderError::InvalidApiKey {
                provider: self.name.to_string(),
            })?;
        headers.insert(AUTHORIZATION, bearer);

        tracing::debug!(provider = self.name, model = %body.model, "sending chat completion");
        let url = format!("{}{}", self.base_url, self.path);
        let raw = post_json(&self.client, &url, headers, &body).await?;
        self.parse_response(raw, &body.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::GenerateOptions;
    use serde_json::json;
    use tradegen_core::ApiKey;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::openai(reqwest::Client::new())
    }

    #[test]
    fn test_validate_api_key() {
        let p = provider();
        assert!(p.validate_api_key("sk-proj-abcdefghijklmnop"));
        assert!(!p.validate_api_key("sk-short"));
        assert!(!p.validate_api_key("pk-abcdefghijklmnopqrstu"));
        assert!(!p.validate_api_key(""));
    }

    #[test]
    fn test_request_body_has_system_role() {
        let key = ApiKey::new("sk-proj-abcdefghijklmnop");
        let request = GenerateRequest {
            system_prompt: "You are a trader",
            user_prompt: "Find setups",
            api_key: &key,
            options: GenerateOptions {
                model: Some("gpt-4o-mini".into()),
                ..Default::default()
            },
        };
        let body = serde_json::to_value(provider().request_body(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Find setups");
        assert_eq!(body["max_tokens"], 4096);
    }

    #[test]
    fn test_parse_response() {
        let raw = json!({
            "model": "gpt-4o-2024-08-06",
            "choices": [{ "message": { "role": "assistant", "content": "[]" } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 30 }
        });
        let response = provider().parse_response(raw, "gpt-4o").unwrap();
        assert_eq!(response.content, "[]");
        assert_eq!(response.model, "gpt-4o-2024-08-06");
        assert_eq!(response.usage.total(), 150);
    }

    #[test]
    fn test_parse_response_missing_content() {
        let raw = json!({ "choices": [] });
        assert!(matches!(
            provider().parse_response(raw, "gpt-4o"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_deepseek_info() {
        let info = OpenAiProvider::deepseek(reqwest::Client::new()).info();
        assert_eq!(info.name, "deepseek");
        assert_eq!(info.default_model, "deepseek-chat");
    }
}
