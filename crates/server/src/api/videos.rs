//! Video ingest, cancel and lookup handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vidkeep_core::extractor::VideoMetadata;
use vidkeep_core::{VideoError, VideoRecord, VideoStatus};

use super::error::{api_error, signal_error, video_error, ApiError};
use crate::metrics::{CANCEL_REQUESTS, INGEST_REQUESTS};
use crate::state::AppState;

/// Stored on a record whose job could not be queued.
const ENQUEUE_FAILED_MESSAGE: &str = "Failed to queue download";

/// Watch, short, embed and mobile URL forms, in that order.
static YOUTUBE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})",
        r"(?:https?://)?youtu\.be/([a-zA-Z0-9_-]{11})",
        r"(?:https?://)?(?:www\.)?youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        r"(?:https?://)?m\.youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Extract the 11-character video id from a YouTube URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    YOUTUBE_PATTERNS.iter().find_map(|re| {
        re.captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IngestBody {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub video_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub video_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVideoBody {
    pub is_favorite: Option<bool>,
}

/// A video record as returned by the API.
#[derive(Debug, Serialize)]
pub struct VideoResponse {
    #[serde(flatten)]
    pub record: VideoRecord,
    pub youtube_url: String,
}

impl From<VideoRecord> for VideoResponse {
    fn from(record: VideoRecord) -> Self {
        let youtube_url = format!("https://www.youtube.com/watch?v={}", record.video_id);
        Self {
            record,
            youtube_url,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/videos/ingest
///
/// New videos are probed for metadata, recorded as pending and queued.
/// Failed or cancelled videos are re-armed and queued again.
pub async fn ingest_video(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IngestBody>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let url = body.url.trim().to_string();
    if url.is_empty() {
        INGEST_REQUESTS.with_label_values(&["invalid"]).inc();
        return Err(api_error(StatusCode::BAD_REQUEST, "URL is required"));
    }
    let Some(video_id) = extract_video_id(&url) else {
        INGEST_REQUESTS.with_label_values(&["invalid"]).inc();
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid YouTube URL format"));
    };

    let store = state.store();
    if let Some(existing) = store.get(&video_id).map_err(video_error)? {
        return match existing.status {
            VideoStatus::Failed | VideoStatus::Cancelled => {
                store.retry(&video_id).map_err(video_error)?;
                // A signal left over from the previous attempt must not cancel this one.
                if let Ok(true) = state.signals().consume(&video_id).await {
                    debug!(video_id = %video_id, "Cleared stale cancellation signal");
                }
                enqueue(&state, &video_id, &url).await?;
                INGEST_REQUESTS.with_label_values(&["retried"]).inc();
                info!(video_id = %video_id, previous = %existing.status, "Video re-queued");
                Ok(accepted(video_id, "Video retry queued for download"))
            }
            status => {
                INGEST_REQUESTS.with_label_values(&["conflict"]).inc();
                Err(api_error(
                    StatusCode::CONFLICT,
                    format!("Video already exists with status: {}", status),
                ))
            }
        };
    }

    let extractor = Arc::clone(state.extractor());
    let probe_url = url.clone();
    let info = tokio::task::spawn_blocking(move || extractor.probe(&probe_url))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            INGEST_REQUESTS.with_label_values(&["probe_failed"]).inc();
            warn!(video_id = %video_id, error = %e, "Metadata probe failed");
            api_error(
                StatusCode::BAD_REQUEST,
                format!("Failed to fetch video metadata: {}", e),
            )
        })?;

    let metadata = VideoMetadata::from_info(&info);
    match store.create(metadata.to_new_video(&video_id)) {
        Ok(_) => {}
        Err(e @ VideoError::AlreadyExists(_)) => {
            INGEST_REQUESTS.with_label_values(&["conflict"]).inc();
            return Err(video_error(e));
        }
        Err(e) => return Err(video_error(e)),
    }

    enqueue(&state, &video_id, &url).await?;
    INGEST_REQUESTS.with_label_values(&["queued"]).inc();
    info!(video_id = %video_id, title = %metadata.title, "Video queued");
    Ok(accepted(video_id, "Video queued for download"))
}

/// POST /api/videos/{id}/cancel
///
/// Sets the cancellation signal; the worker records `cancelled` at its next
/// checkpoint.
pub async fn cancel_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<(StatusCode, Json<CancelResponse>), ApiError> {
    let record = state
        .store()
        .get(&video_id)
        .map_err(video_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Video not found: {}", video_id)))?;

    if !record.status.is_active() {
        CANCEL_REQUESTS.with_label_values(&["conflict"]).inc();
        return Err(api_error(
            StatusCode::CONFLICT,
            format!("Video cannot be cancelled with status: {}", record.status),
        ));
    }

    let newly_set = state
        .signals()
        .request(&video_id)
        .await
        .map_err(signal_error)?;

    let message = if newly_set {
        CANCEL_REQUESTS.with_label_values(&["requested"]).inc();
        info!(video_id = %video_id, status = %record.status, "Cancellation requested");
        "Cancellation requested"
    } else {
        CANCEL_REQUESTS.with_label_values(&["duplicate"]).inc();
        debug!(video_id = %video_id, "Cancellation already pending");
        "Cancellation already requested"
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            video_id,
            message: message.to_string(),
        }),
    ))
}

/// GET /api/videos/{id}
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResponse>, ApiError> {
    match state.store().get(&video_id).map_err(video_error)? {
        Some(record) => Ok(Json(VideoResponse::from(record))),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Video not found: {}", video_id),
        )),
    }
}

/// PATCH /api/videos/{id}
pub async fn update_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    Json(body): Json<UpdateVideoBody>,
) -> Result<Json<VideoResponse>, ApiError> {
    let store = state.store();
    if let Some(favorite) = body.is_favorite {
        store
            .set_favorite(&video_id, favorite)
            .map_err(video_error)?;
    }
    match store.get(&video_id).map_err(video_error)? {
        Some(record) => Ok(Json(VideoResponse::from(record))),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Video not found: {}", video_id),
        )),
    }
}

fn accepted(video_id: String, message: &str) -> (StatusCode, Json<IngestResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            video_id,
            message: message.to_string(),
        }),
    )
}

/// Queue a job; if that fails, park the pending record as cancelled so a
/// later ingest can retry it.
async fn enqueue(state: &AppState, video_id: &str, url: &str) -> Result<(), ApiError> {
    match state.queue().enqueue(video_id, url).await {
        Ok(job_id) => {
            debug!(video_id = %video_id, job_id = %job_id, "Job enqueued");
            Ok(())
        }
        Err(e) => {
            error!(video_id = %video_id, error = %e, "Failed to enqueue job");
            if let Err(e) = state.store().cancel(video_id, ENQUEUE_FAILED_MESSAGE) {
                error!(video_id = %video_id, error = %e, "Failed to park unqueued video");
            }
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to queue download: {}", e),
            ))
        }
    }
}
