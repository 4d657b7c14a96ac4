//! API Handlers
use crate::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tradegen_core::{ExecutionStatus, PipelineError, PipelineInput, TRADEGEN_VERSION};
use tradegen_stages::standard_pipeline;

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Run the standard pipeline once and return the redacted execution view.
///
/// 400 when the provider is unknown or the key is malformed; 200 on success;
/// 502 when the provider failed; 500 for any other terminal failure. The body is the execution view in every case.
pub async fn generate(State(state): State<AppState>, Json(input): Json<PipelineInput>) -> Response {
    let provider = input.config.ai_provider.clone();
    let Ok(adapter) = state.deps.registry.get(&provider) else {
        return bad_request(format!(
            "unknown provider '{}'; available: {}",
            provider,
            state.deps.registry.names().join(", ")
        ));
    };
    if input.config.api_key.is_empty() {
        return bad_request("config.apiKey is required".to_string());
    }
    if !adapter.validate_api_key(input.config.api_key.expose()) {
        return bad_request(format!(
            "config.apiKey is not a valid {} key",
            adapter.info().display_name
        ));
    }
    if input.config.num_results == 0 {
        return bad_request("config.numResults must be at least 1".to_string());
    }

    let runner = match standard_pipeline(&state.deps) {
        Ok(runner) => runner,
        Err(e) => {
            tracing::error!(error = %e, "pipeline assembly failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() })))
                .into_response();
        }
    };

    let ctx = runner.execute(input).await;
    state.metrics.observe(&ctx);

    let status = match (ctx.status(), ctx.error().map(|f| &f.error)) {
        (ExecutionStatus::Completed, _) => StatusCode::OK,
        (_, Some(PipelineError::Provider { .. })) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::info!(
        execution_id = ctx.execution_id(),
        provider = %provider,
        status = status.as_u16(),
        duration_ms = ctx.duration_ms(),
        "generate finished"
    );
    (status, Json(ctx.view())).into_response()
}

pub async fn list_providers(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "providers": state.deps.registry.infos() }))
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "version": TRADEGEN_VERSION })))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
