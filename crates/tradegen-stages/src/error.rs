use thiserror::Error;
use tradegen_core::StepError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriceError {
    #[error("PRICES/HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("PRICES/transport: {0}")]
    Transport(String),

    #[error("PRICES/unexpected payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for PriceError {
    fn from(e: reqwest::Error) -> Self {
        PriceError::Transport(e.without_url().to_string())
    }
}

impl From<PriceError> for StepError {
    fn from(e: PriceError) -> Self {
        match &e {
            PriceError::Http { status, .. } if !matches!(status, 408 | 429 | 500..=599) => {
                StepError::fatal(e.to_string())
            }
            PriceError::Malformed(_) => StepError::fatal(e.to_string()),
            _ => StepError::failed(e.to_string()),
        }
    }
}
