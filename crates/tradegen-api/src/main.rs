//! Binary entrypoint for the trade generation API server.
use tracing_subscriber::EnvFilter;
use tradegen_api::{run, ApiError, ApiSettings};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    run(ApiSettings::from_env()).await
}
