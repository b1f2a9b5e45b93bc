//! JSON error bodies and domain error mapping.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::error;

use vidkeep_core::{QueueError, SignalError, StreamError, VideoError};

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status plus JSON body, returned from handlers as `Err`.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn video_error(e: VideoError) -> ApiError {
    match e {
        VideoError::NotFound(id) => api_error(StatusCode::NOT_FOUND, format!("Video not found: {}", id)),
        VideoError::AlreadyExists(_) | VideoError::InvalidTransition { .. } => {
            api_error(StatusCode::CONFLICT, e.to_string())
        }
        VideoError::Database(_) => internal(e),
    }
}

pub fn stream_error(e: StreamError) -> ApiError {
    if e.is_not_found() {
        return api_error(StatusCode::NOT_FOUND, e.to_string());
    }
    match e {
        StreamError::RangeNotSatisfiable { .. } => {
            api_error(StatusCode::RANGE_NOT_SATISFIABLE, e.to_string())
        }
        other => internal(other),
    }
}

pub fn queue_error(e: QueueError) -> ApiError {
    internal(e)
}

pub fn signal_error(e: SignalError) -> ApiError {
    internal(e)
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    error!(error = %e, "Request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
