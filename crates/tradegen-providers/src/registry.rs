//! Name → adapter lookup
use crate::anthropic::AnthropicProvider;
use crate::error::ProviderError;
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{AiProvider, ProviderInfo};
use std::collections::HashMap;
use std::sync::Arc;

/// Adapters keyed by lowercase name
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AiProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// openai, anthropic, gemini and deepseek sharing one HTTP client
    pub fn with_defaults(client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(OpenAiProvider::openai(client.clone()));
        registry.register(AnthropicProvider::new(client.clone()));
        registry.register(GeminiProvider::new(client.clone()));
        registry.register(OpenAiProvider::deepseek(client));
        registry
    }

    /// Register under `info().name`, replacing any previous entry
    pub fn register(&mut self, provider: impl AiProvider + 'static) -> &mut Self {
        self.register_arc(Arc::new(provider))
    }

    pub fn register_arc(&mut self, provider: Arc<dyn AiProvider>) -> &mut Self {
        let name = provider.info().name.to_lowercase();
        tracing::debug!(provider = %name, "registered AI provider");
        self.providers.insert(name, provider);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn AiProvider>, ProviderError> {
        self.providers
            .get(&name.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(&name.trim().to_lowercase())
    }

    /// Sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted by name
    pub fn infos(&self) -> Vec<ProviderInfo> {
        let mut infos: Vec<ProviderInfo> = self.providers.values().map(|p| p.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = ProviderRegistry::with_defaults(reqwest::Client::new());
        assert_eq!(
            registry.names(),
            vec!["anthropic", "deepseek", "gemini", "openai"]
        );
        assert_eq!(registry.infos()[0].display_name, "Anthropic Claude");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ProviderRegistry::with_defaults(reqwest::Client::new());
        assert_eq!(registry.get("OpenAI").unwrap().info().name, "openai");
        assert!(registry.contains(" Gemini "));
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.get("mistral").err(),
            Some(ProviderError::UnknownProvider("mistral".into()))
        );
    }
}
