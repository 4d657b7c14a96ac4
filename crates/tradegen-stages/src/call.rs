//! callAIProvider
use crate::keys::PROMPT;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tradegen_core::{to_output, Step, StepContext, StepError};
use tradegen_providers::{GenerateOptions, GenerateRequest, ProviderRegistry};

/// Dispatches the prompt to the provider named in the request.
///
/// The orchestrator drops this future on timeout or cancellation, which
/// drops the in-flight HTTP request with it.
pub struct CallProvider {
    registry: Arc<ProviderRegistry>,
}

impl CallProvider {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Step for CallProvider {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<Value, StepError> {
        let prompt = ctx.require(&PROMPT)?;
        let input = ctx.input;
        let config = &input.config;
        let provider_name = config.ai_provider.as_str();
        let provider = self
            .registry
            .get(provider_name)
            .map_err(|e| e.into_step_error(provider_name))?;

        let request = GenerateRequest {
            system_prompt: &prompt.system,
            user_prompt: &prompt.user,
            api_key: &config.api_key,
            options: GenerateOptions {
                model: config.model.clone(),
                ..Default::default()
            },
        };
        let response = provider
            .generate(request)
            .await
            .map_err(|e| e.into_step_error(provider_name))?;

        ctx.info(
            "provider responded",
            &json!({
                "provider": response.provider,
                "model": response.model,
                "input_tokens": response.usage.input_tokens,
                "output_tokens": response.usage.output_tokens,
                "content_chars": response.content.len(),
            }),
        );
        to_output(&response)
    }
}
