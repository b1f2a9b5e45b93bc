//! Byte-range streaming of stored media.

mod engine;
mod range;

pub use engine::{MediaStream, ResolvedMedia, StreamingEngine, CHUNK_SIZE};
pub use range::{parse_range, RangeError, RangeWindow};

use thiserror::Error;

use crate::video::{VideoError, VideoStatus};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("video not found: {0}")]
    VideoNotFound(String),

    #[error("video {video_id} is not downloaded (status {status})")]
    NotComplete {
        video_id: String,
        status: VideoStatus,
    },

    #[error("media file missing for {0}")]
    FileMissing(String),

    #[error("range not satisfiable for a {size}-byte file")]
    RangeNotSatisfiable { size: u64 },

    #[error(transparent)]
    Store(#[from] VideoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Resolution failures a client sees as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StreamError::VideoNotFound(_)
                | StreamError::NotComplete { .. }
                | StreamError::FileMissing(_)
        )
    }
}
