//! Adapter around the external media extractor.
//!
//! The extractor is blocking: [`Extractor::download`] holds the calling thread
//! for the whole transfer and reports progress through a callback on that
//! same thread. Callers run it on a blocking pool.

mod metadata;
mod ytdlp;

pub use metadata::{parse_upload_date, truncate_chars, VideoMetadata, DESCRIPTION_MAX_CHARS};
pub use ytdlp::{parse_progress_line, YtDlpExtractor, FORMAT_TEMPLATE, PROGRESS_MARKER};

use std::fmt;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Instant;

use serde::Deserialize;
use thiserror::Error;

/// Why a download was stopped at a tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
    TimedOut,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Cancelled => f.write_str("cancelled"),
            AbortReason::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Errors from the extractor.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("failed to launch extractor: {0}")]
    Spawn(String),

    /// The extractor ran and reported a failure.
    #[error("{0}")]
    Failed(String),

    #[error("invalid extractor output: {0}")]
    InvalidOutput(String),

    #[error("download aborted: {0}")]
    Aborted(AbortReason),
}

/// One progress report from the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTick {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
}

/// What to download and where.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub video_id: String,
    pub source_url: String,
    /// Final media file.
    pub output_path: PathBuf,
    /// Stop with [`AbortReason::TimedOut`] once this passes.
    pub deadline: Option<Instant>,
}

/// The subset of the extractor's info document that is consumed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Callback invoked once per progress tick. `Break` aborts the download.
pub type ProgressCallback<'a> = dyn FnMut(ProgressTick) -> ControlFlow<AbortReason> + 'a;

/// Blocking media extractor.
pub trait Extractor: Send + Sync {
    /// Download media to `request.output_path`, reporting progress.
    ///
    /// Returns [`ExtractorError::Aborted`] when the callback breaks or the
    /// deadline passes; partial files may be left behind in that case.
    fn download(
        &self,
        request: &DownloadRequest,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<ExtractedInfo, ExtractorError>;

    /// Fetch metadata only.
    fn probe(&self, source_url: &str) -> Result<ExtractedInfo, ExtractorError>;
}
