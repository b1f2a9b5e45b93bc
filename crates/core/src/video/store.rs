//! Video storage trait and error type.

use thiserror::Error;

use super::{CompletedVideo, NewVideo, VideoRecord, VideoStatus};

/// Error type for video record operations.
#[derive(Debug, Error)]
pub enum VideoError {
    /// No record with this identifier.
    #[error("video not found: {0}")]
    NotFound(String),

    /// A record with this identifier already exists.
    #[error("video already exists: {0}")]
    AlreadyExists(String),

    /// The record's current status does not allow the requested transition.
    #[error("cannot move video {video_id} from {from} to {to}")]
    InvalidTransition {
        video_id: String,
        from: VideoStatus,
        to: VideoStatus,
    },

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for VideoError {
    fn from(e: rusqlite::Error) -> Self {
        VideoError::Database(e.to_string())
    }
}

/// Trait for video record storage backends.
///
/// Every transition is a single guarded point write; no lock spans a job.
pub trait VideoStore: Send + Sync {
    /// Insert a new record in `pending`.
    fn create(&self, video: NewVideo) -> Result<VideoRecord, VideoError>;

    /// Get a record by identifier.
    fn get(&self, video_id: &str) -> Result<Option<VideoRecord>, VideoError>;

    /// `pending -> downloading`.
    fn begin_download(&self, video_id: &str) -> Result<(), VideoError>;

    /// `downloading -> complete`, committing metadata and size together.
    fn complete(&self, video_id: &str, completed: CompletedVideo) -> Result<(), VideoError>;

    /// `downloading -> failed` with the failure message.
    fn fail(&self, video_id: &str, message: &str) -> Result<(), VideoError>;

    /// Move to `cancelled`. Returns `false` if the record was already cancelled.
    fn cancel(&self, video_id: &str, message: &str) -> Result<bool, VideoError>;

    /// `failed | cancelled -> pending`, clearing the error message.
    fn retry(&self, video_id: &str) -> Result<(), VideoError>;

    /// Set or clear the favorite flag.
    fn set_favorite(&self, video_id: &str, favorite: bool) -> Result<(), VideoError>;

    /// Number of records currently in `status`.
    fn count_by_status(&self, status: VideoStatus) -> Result<i64, VideoError>;

    /// Round-trip to the database. Returns the engine version.
    fn ping(&self) -> Result<String, VideoError>;
}
