use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use docextract_config::PipelineConfig;
use docextract_core::ExtractionRequest;
use docextract_pipeline::{check_services, CacheStats, ExtractionPipeline};

/// Optional upload name; only used for type sniffing and logs.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Upload ceiling. Slightly above the largest file any backend accepts.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state for API handlers.
pub struct AppState {
    pub pipeline: ExtractionPipeline,
    pub config: PipelineConfig,
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/extract", post(extract))
        .route("/api/cache/stats", get(cache_stats))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let services = check_services(&state.config).await;
    Json(json!({
        "status": if services.any_available() { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "services": services,
    }))
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.pipeline.cache_stats())
}

/// Extract text from the raw request body.
async fn extract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "request body is empty" })),
        )
            .into_response();
    }

    let mime_type = header_str(&headers, header::CONTENT_TYPE.as_str())
        .unwrap_or("")
        .to_string();
    let file_name = header_str(&headers, FILE_NAME_HEADER).unwrap_or("upload").to_string();

    let request = ExtractionRequest::new(body, mime_type, file_name);
    info!(
        request_id = %request.id(),
        file = %request.file_name(),
        mime = %request.mime_type(),
        size = request.len(),
        "Extraction requested"
    );

    let result = state.pipeline.extract(&request).await;
    let body = match serde_json::to_value(result.as_ref()) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Failed to serialize extraction result");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if result.success {
        (StatusCode::OK, Json(body)).into_response()
    } else {
        let message = result.error.clone().unwrap_or_else(|| "extraction failed".to_string());
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": message, "result": body })),
        )
            .into_response()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
