//! Admin HTTP surface and the stream WebSocket endpoint.
//!
//! Admin operations mutate the shared tracker state synchronously and
//! return the current status; they live outside the per-frame hot path.

use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use wc_common::{AppError, AppResult};
use wc_protocol::{
    EngineRequest, FpsRequest, LockRequest, StatusResponse, WindowsResponse,
};

use crate::capture::{CaptureRequest, CaptureSelector, EngineKind};
use crate::encoder::{FrameEncoder, JpegEncoder};
use crate::platform;
use crate::session::StreamSession;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/windows", get(windows))
        .route("/lock", post(lock))
        .route("/unlock", post(unlock))
        .route("/lock_current", post(lock_current))
        .route("/fps", post(set_fps))
        .route("/engine", post(set_engine))
        .route("/capture", get(capture_once))
        .route("/stream", get(stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(state.status())
}

async fn windows(State(state): State<Arc<AppState>>) -> Json<WindowsResponse> {
    let windows = state
        .tracker
        .list_candidates(state.windows.as_ref())
        .iter()
        .map(|w| w.entry())
        .collect();
    Json(WindowsResponse { windows })
}

async fn lock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LockRequest>,
) -> AppResult<Json<StatusResponse>> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be empty".into()));
    }
    state.tracker.lock(title);
    Ok(Json(state.status()))
}

async fn lock_current(State(state): State<Arc<AppState>>) -> AppResult<Json<StatusResponse>> {
    state.tracker.lock_current()?;
    Ok(Json(state.status()))
}

async fn unlock(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    state.tracker.unlock();
    Json(state.status())
}

async fn set_fps(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FpsRequest>,
) -> Json<StatusResponse> {
    state.tracker.set_fps(req.fps);
    Json(state.status())
}

async fn set_engine(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EngineRequest>,
) -> AppResult<Json<StatusResponse>> {
    let engine = EngineKind::parse(&req.engine)
        .ok_or_else(|| AppError::BadRequest(format!("unknown capture engine: {}", req.engine)))?;
    state.tracker.set_engine(engine);
    Ok(Json(state.status()))
}

/// One-shot snapshot of the current target at snapshot quality.
async fn capture_once(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let target = state.tracker.resolve(state.windows.as_ref())?;

    let req = CaptureRequest {
        handle: target.handle,
        rect: target.rect,
        fast: false,
        locked: state.tracker.is_locked(),
    };
    let engine = state.tracker.engine();
    let quality = state.config.stream.snapshot_quality;

    // Blocking GDI/DXGI work stays off the async workers.
    let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, AppError> {
        let mut selector = CaptureSelector::new(platform::capture_backends());
        let frame = selector
            .capture(&req, engine)
            .map_err(|e| AppError::CaptureFailed(e.to_string()))?;
        let mut encoder = JpegEncoder::new(quality);
        encoder
            .encode(&frame)
            .map_err(|e| AppError::EncodeFailed(e.to_string()))
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::Error::new(e)))??;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

async fn stream(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| StreamSession::new(state).run(socket))
}
