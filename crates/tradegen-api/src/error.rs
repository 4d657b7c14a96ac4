use thiserror::Error;
use tradegen_core::AssemblyError;
use tradegen_validation::ConfigError;

/// Startup failures of the server
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO/{context}: {message}")]
    Io { context: String, message: String },

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("METRICS/{0}")]
    Metrics(#[from] prometheus::Error),

    #[error("HTTP/client: {0}")]
    Client(#[from] reqwest::Error),
}
