use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Convenient Result alias.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// `EncodeFailed` never reaches a client on the frame path — the encoder
/// chain always falls back to the baseline — but one-shot snapshot
/// handlers can still surface it.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Target window not found: {0}")]
    TargetNotFound(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    #[error("Input injection failed: {0}")]
    InjectionFailed(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::TargetNotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::CaptureFailed(_)
            | Self::EncodeFailed(_)
            | Self::InjectionFailed(_)
            | Self::TransportClosed
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
