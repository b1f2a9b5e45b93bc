//! Queue status handler.

use axum::{extract::State, Json};
use std::sync::Arc;
use vidkeep_core::QueueStatus;

use super::error::{queue_error, ApiError};
use crate::state::AppState;

/// GET /api/queue/status
pub async fn queue_status(State(state): State<Arc<AppState>>) -> Result<Json<QueueStatus>, ApiError> {
    state.queue().status().await.map(Json).map_err(queue_error)
}
