use thiserror::Error;
use tradegen_core::StepError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("AUTH/invalid API key format for {provider}")]
    InvalidApiKey { provider: String },

    #[error("HTTP/{status}: {message}")]
    Http { status: u16, message: String },

    #[error("TRANSPORT/{0}")]
    Transport(String),

    #[error("PARSE/{0}")]
    MalformedResponse(String),

    #[error("REGISTRY/unknown provider '{0}'")]
    UnknownProvider(String),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Timeouts, rate limits, server errors and transport failures may clear up
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http { status, .. } => matches!(status, 408 | 429 | 500..=599),
            ProviderError::Transport(_) => true,
            _ => false,
        }
    }

    /// Lift into a step failure attributed to `provider`
    pub fn into_step_error(self, provider: &str) -> StepError {
        StepError::Provider {
            provider: provider.to_string(),
            status: self.status(),
            retryable: self.is_retryable(),
            message: self.to_string(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Transport(e.without_url().to_string())
    }
}
