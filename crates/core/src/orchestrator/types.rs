//! Types for the download orchestrator.

use thiserror::Error;

use crate::extractor::ExtractorError;
use crate::video::VideoError;

/// How a job ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Cancelled => "cancelled",
        }
    }
}

/// Errors that can occur while running a job.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The record could not be moved to `downloading`; nothing was recorded.
    #[error("cannot start download: {0}")]
    NotStartable(#[source] VideoError),

    /// Record store error after the job started.
    #[error("video store error: {0}")]
    Store(#[from] VideoError),

    /// The extractor reported a failure.
    #[error("{0}")]
    Extractor(#[from] ExtractorError),

    /// The attempt ran past its deadline.
    #[error("download timed out after {0} seconds")]
    TimedOut(u64),

    /// The blocking extractor task panicked or was aborted.
    #[error("extractor task failed: {0}")]
    Task(String),

    /// The downloaded media file could not be read.
    #[error("downloaded file unavailable: {0}")]
    Media(#[source] std::io::Error),
}

impl OrchestratorError {
    /// Whether the failure was recorded on the video and a retry makes sense.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, OrchestratorError::NotStartable(_))
    }

    /// Label used for metrics.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            OrchestratorError::TimedOut(_) => "timed_out",
            _ => "failed",
        }
    }
}
