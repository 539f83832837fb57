use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use focus_analytics::FocusService;
use focus_core::error::TrackerError;
use focus_core::timestamp::now_utc;
use focus_core::types::SessionId;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

// ── Errors ──────────────────────────────────────────────────────────────

/// JSON error body: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        let status = match &err {
            TrackerError::NotFound(_) | TrackerError::NotReady(_) => StatusCode::NOT_FOUND,
            TrackerError::InvalidState(_)
            | TrackerError::MalformedTimeline { .. }
            | TrackerError::InvalidTimestamp(_) => StatusCode::BAD_REQUEST,
            TrackerError::Storage(_)
            | TrackerError::Config(_)
            | TrackerError::Serialization(_)
            | TrackerError::Io(_)
            | TrackerError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", err);
        }
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

/// Run a store-touching service call off the async worker threads.
async fn with_service<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&FocusService) -> focus_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}

// ── Health ──────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ── Sessions ────────────────────────────────────────────────────────────

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(start_session))
        .route("/api/sessions/active", get(active_session))
        .route("/api/sessions/{id}", patch(end_session).get(get_session))
        .route("/api/sessions/{id}/summary", get(session_summary))
        .route("/api/sessions/{id}/distractions", post(record_distraction))
}

async fn start_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let session = with_service(&state, |service| service.start_session(now_utc())).await?;
    Ok(Json(session))
}

async fn active_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let active = with_service(&state, |service| service.active_session(now_utc())).await?;
    Ok(Json(active))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse, ApiError> {
    let session = with_service(&state, move |service| service.session(id)).await?;
    Ok(Json(session))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse, ApiError> {
    let ended = with_service(&state, move |service| service.end_session(id, now_utc())).await?;
    Ok(Json(ended))
}

async fn session_summary(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = with_service(&state, move |service| service.session_summary(id)).await?;
    Ok(Json(summary))
}

async fn record_distraction(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse, ApiError> {
    let distraction =
        with_service(&state, move |service| service.record_distraction(id, now_utc())).await?;
    Ok(Json(distraction))
}

// ── Stats ───────────────────────────────────────────────────────────────

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/api/stats", get(stats))
}

async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = with_service(&state, |service| service.stats(now_utc())).await?;
    Ok(Json(stats))
}

// ── Static SPA ──────────────────────────────────────────────────────────

/// Serve the single-page app: `/` maps to `index.html`, the service worker
/// lives at the root so its scope covers the whole site, and everything else
/// is under `/static`.
pub fn spa_routes(static_dir: Option<PathBuf>) -> Router<AppState> {
    let Some(dir) = static_dir else {
        return Router::new();
    };
    Router::new()
        .route_service("/", ServeFile::new(dir.join("index.html")))
        .route_service("/service-worker.js", ServeFile::new(dir.join("service-worker.js")))
        .nest_service("/static", ServeDir::new(dir))
}
