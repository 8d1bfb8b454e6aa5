//! HTTP API handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::config::StreamUrlResolver;
use crate::service::{MetadataService, ServiceError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metadata: MetadataService,
    pub stream_url: Arc<dyn StreamUrlResolver>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(metadata: MetadataService, stream_url: Arc<dyn StreamUrlResolver>) -> Self {
        Self {
            metadata,
            stream_url,
            started_at: Instant::now(),
        }
    }
}

/// Build the router: API routes, optional static files, middleware
pub fn router(state: AppState, public_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/metadata", get(metadata_handler))
        .route("/config", get(config_handler))
        .route("/status", get(status_handler));

    let app = match public_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Status code and client-facing message for a failed metadata request.
///
/// Messages are fixed strings; details stay in the server log.
pub fn service_error_status(err: &ServiceError) -> (StatusCode, &'static str) {
    match err {
        ServiceError::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
        ServiceError::Connect(_) => (StatusCode::BAD_GATEWAY, "Failed to fetch metadata"),
        ServiceError::Transport(_) => (StatusCode::BAD_GATEWAY, "Stream error"),
        ServiceError::Decode(_) => (StatusCode::BAD_GATEWAY, "Failed to parse metadata"),
        ServiceError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Request timeout"),
    }
}

/// GET /metadata - Current track from the stream's ICY metadata
pub async fn metadata_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metadata.get_metadata().await {
        Ok(metadata) => (StatusCode::OK, Json(metadata)).into_response(),
        Err(e) => {
            tracing::warn!("Metadata request failed: {}", e);
            let (status, message) = service_error_status(&e);
            error_response(status, message)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub stream_url: String,
}

/// GET /config - Stream URL for the player
pub async fn config_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.stream_url.resolve_stream_url().await {
        Ok(stream_url) => (StatusCode::OK, Json(ConfigResponse { stream_url })).into_response(),
        Err(e) => {
            tracing::error!("Error reading stream URL: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read configuration",
            )
        }
    }
}

/// General status response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub git_sha: &'static str,
    pub uptime_secs: u64,
    pub cache_populated: bool,
    pub cache_age_ms: Option<u64>,
}

/// GET /status - Service health check
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let now = Instant::now();
    let cache = state.metadata.cache();

    Json(StatusResponse {
        service: "radio-calico",
        version: env!("CALICO_VERSION"),
        git_sha: env!("CALICO_GIT_SHA"),
        uptime_secs: now.duration_since(state.started_at).as_secs(),
        cache_populated: cache.peek().is_some(),
        cache_age_ms: cache.age(now).map(|age| age.as_millis() as u64),
    })
}
