//! Trade generation API /v1: REST endpoints
//!
//! | method | path            |                                   |
//! |--------|-----------------|-----------------------------------|
//! | POST   | `/v1/generate`  | run the pipeline for `{strategy, config}` |
//! | GET    | `/v1/providers` | registered AI providers           |
//! | GET    | `/v1/health`    | liveness                          |
//! | GET    | `/metrics`      | prometheus text format            |
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;

pub use config::ApiSettings;
pub use error::ApiError;
pub use metrics::Metrics;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tradegen_providers::ProviderRegistry;
use tradegen_stages::{HttpPriceSource, PipelineDeps};

/// Shared, read-mostly state behind every handler
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<PipelineDeps>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(deps: PipelineDeps) -> Result<Self, ApiError> {
        Ok(Self {
            deps: Arc::new(deps),
            metrics: Arc::new(Metrics::new()?),
        })
    }

    /// Default providers and HTTP prices, both on one client
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tradegen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let registry = Arc::new(ProviderRegistry::with_defaults(client.clone()));
        let prices = Arc::new(HttpPriceSource::with_base_url(client, settings.price_url.clone()));
        let deps = PipelineDeps::new(registry, prices).with_profile(settings.load_profile()?);
        Self::new(deps)
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/generate", post(handlers::generate))
        .route("/v1/providers", get(handlers::list_providers))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors())
}

pub async fn run(settings: ApiSettings) -> Result<(), ApiError> {
    let state = AppState::from_settings(&settings)?;
    tracing::info!(
        providers = ?state.deps.registry.names(),
        profile = %state.deps.profile.name,
        "pipeline ready"
    );
    let app = create_app(state);
    let io_error = |context: &str, e: std::io::Error| ApiError::Io {
        context: context.to_string(),
        message: e.to_string(),
    };
    let listener = tokio::net::TcpListener::bind(&settings.addr)
        .await
        .map_err(|e| io_error("bind", e))?;

    tracing::info!("tradegen API listening on {}", settings.addr);
    axum::serve(listener, app).await.map_err(|e| io_error("serve", e))
}
