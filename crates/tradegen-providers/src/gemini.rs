//! Google Gemini `generateContent`
//!
//! No system role: system and user text are concatenated into a single
//! user part. Safety thresholds are relaxed to `BLOCK_ONLY_HIGH` so market
//! vocabulary ("short", "kill the position", "liquidation") is not refused.
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

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: &'static str,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiProvider {
    pub const NAME: &'static str = "gemini";
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-pro";

    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model_for(request: &GenerateRequest<'_>) -> String {
        request
            .options
            .model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string())
    }

    pub fn request_body(&self, request: &GenerateRequest<'_>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: format!("{}\n\n{}", request.system_prompt, request.user_prompt),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                max_output_tokens: request.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_ONLY_HIGH",
                })
                .collect(),
        }
    }

    pub fn parse_response(&self, raw: Value, model: &str) -> Result<ProviderResponse, ProviderError> {
        let Some(parts) = raw
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
        else {
            let reason = raw
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .map(|r| format!("prompt blocked: {r}"))
                .unwrap_or_else(|| "missing field '/candidates/0/content/parts'".to_string());
            return Err(ProviderError::MalformedResponse(reason));
        };

        let content: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "candidate carried no text parts".into(),
            ));
        }

        Ok(ProviderResponse {
            provider: Self::NAME.to_string(),
            model: model.to_string(),
            content,
            usage: TokenUsage {
                input_tokens: token_count(&raw, "/usageMetadata/promptTokenCount"),
                output_tokens: token_count(&raw, "/usageMetadata/candidatesTokenCount"),
            },
            raw,
        })
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: Self::NAME.to_string(),
            display_name: "Google Gemini".to_string(),
            default_model: Self::DEFAULT_MODEL.to_string(),
            supports_system_prompt: false,
        }
    }

    fn validate_api_key(&self, key: &str) -> bool {
        let key = key.trim();
        key.starts_with("AIza") && key.len() >= 30
    }

    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ProviderResponse, ProviderError> {
        if !self.validate_api_key(request.api_key.expose()) {
            return Err(ProviderError::InvalidApiKey {
                provider: Self::NAME.to_string(),
            });
        }

        let model = Self::model_for(&request);
        let body = self.request_body(&request);
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(request.api_key.expose().trim()).map_err(|_| {
                ProviderError::InvalidApiKey {
                    provider: Self::NAME.to_string(),
                }
            })?,
        );

        tracing::debug!(provider = Self::NAME, model = %model, "sending generateContent");
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let raw = post_json(&self.client, &url, headers, &body).await?;
        self.parse_response(raw, &model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::GenerateOptions;
    use serde_json::json;
    use tradegen_core::ApiKey;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(reqwest::Client::new())
    }

    #[test]
    fn test_prompts_concatenated() {
        let key = ApiKey::new("AIzaSyA-abcdefghijklmnopqrstuvwxyz");
        let request = GenerateRequest {
            system_prompt: "SYSTEM",
            user_prompt: "USER",
            api_key: &key,
            options: GenerateOptions::default(),
        };
        let body = serde_json::to_value(provider().request_body(&request)).unwrap();
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "SYSTEM\n\nUSER");
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
        assert!(!provider().info().supports_system_prompt);
    }

    #[test]
    fn test_parse_response() {
        let raw = json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }],
            "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 2 }
        });
        let response = provider().parse_response(raw, "gemini-1.5-pro").unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(response.usage, TokenUsage { input_tokens: 7, output_tokens: 2 });
    }

    #[test]
    fn test_blocked_prompt() {
        let raw = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        match provider().parse_response(raw, "m") {
            Err(ProviderError::MalformedResponse(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_api_key() {
        assert!(provider().validate_api_key("AIzaSyA-abcdefghijklmnopqrstuvwxyz"));
        assert!(!provider().validate_api_key("sk-abcdefghijklmnopqrstuvwxyz1234"));
    }
}
