//! Media streaming and thumbnail handlers.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use vidkeep_core::media::image_content_type;
use vidkeep_core::streaming::{MediaStream, RangeWindow};
use vidkeep_core::StreamError;

use super::error::{api_error, stream_error, video_error, ApiError, ErrorResponse};
use crate::state::AppState;

/// Served when a video has no thumbnail and the caller asked for a fallback.
pub const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="640" height="360" viewBox="0 0 640 360">
  <rect fill="#1a1a2e" width="640" height="360"/>
  <text x="50%" y="50%" fill="#4a4a6a" font-family="sans-serif" font-size="24"
        text-anchor="middle" dominant-baseline="middle">No Thumbnail</text>
</svg>"##;

const THUMBNAIL_CACHE: &str = "public, max-age=86400";
const PLACEHOLDER_CACHE: &str = "public, max-age=3600";

#[derive(Debug, Deserialize)]
pub struct ThumbnailParams {
    pub fallback: Option<bool>,
}

/// GET /api/stream/{id}
///
/// Full file with 200, or the requested window with 206. Bodies are streamed
/// in fixed-size chunks.
pub async fn stream_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    let MediaStream { window, body } = match state.streaming().open(&video_id, range).await {
        Ok(stream) => stream,
        Err(StreamError::RangeNotSatisfiable { size }) => {
            debug!(video_id = %video_id, range = ?range, "Range not satisfiable");
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(
                    header::CONTENT_RANGE,
                    RangeWindow::unsatisfied_content_range(size),
                )],
                Json(ErrorResponse {
                    error: "Requested range not satisfiable".to_string(),
                }),
            )
                .into_response();
        }
        Err(e) => return stream_error(e).into_response(),
    };

    let status = if window.partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, window.len());
    if let Some(content_range) = window.content_range() {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    match builder.body(Body::from_stream(body)) {
        Ok(response) => response,
        Err(e) => {
            warn!(video_id = %video_id, error = %e, "Failed to build stream response");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /api/thumbnail/{id}?fallback=true|false
pub async fn get_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    Query(params): Query<ThumbnailParams>,
) -> Result<Response, ApiError> {
    if state.store().get(&video_id).map_err(video_error)?.is_none() {
        return Err(api_error(StatusCode::NOT_FOUND, "Video not found"));
    }

    let Some(path) = state.layout().find_thumbnail(&video_id) else {
        if params.fallback.unwrap_or(true) {
            return Ok((
                [
                    (header::CONTENT_TYPE, "image/svg+xml"),
                    (header::CACHE_CONTROL, PLACEHOLDER_CACHE),
                ],
                PLACEHOLDER_SVG,
            )
                .into_response());
        }
        return Err(api_error(StatusCode::NOT_FOUND, "Thumbnail not found"));
    };

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        warn!(video_id = %video_id, error = %e, "Failed to read thumbnail");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read thumbnail")
    })?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
    let disposition =
        HeaderValue::from_str(&format!("inline; filename=\"{}.{}\"", video_id, extension))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(image_content_type(&path))),
            (header::CACHE_CONTROL, HeaderValue::from_static(THUMBNAIL_CACHE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
