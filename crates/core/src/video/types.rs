//! Video record types and the status state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Pending,
    Downloading,
    Complete,
    Failed,
    Cancelled,
}

impl VideoStatus {
    pub const ALL: [VideoStatus; 5] = [
        VideoStatus::Pending,
        VideoStatus::Downloading,
        VideoStatus::Complete,
        VideoStatus::Failed,
        VideoStatus::Cancelled,
    ];

    /// Get the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Downloading => "downloading",
            VideoStatus::Complete => "complete",
            VideoStatus::Failed => "failed",
            VideoStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the state machine allows `self -> next`.
    ///
    /// `Failed/Cancelled -> Pending` is only ever taken by an explicit retry.
    /// `Pending -> Cancelled` is taken when a cancel request is consumed
    /// before the job starts.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        use VideoStatus::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Pending, Cancelled)
                | (Downloading, Complete)
                | (Downloading, Failed)
                | (Downloading, Cancelled)
                | (Failed, Pending)
                | (Cancelled, Pending)
        )
    }

    /// Statuses from which `next` can be reached.
    pub fn sources_of(next: VideoStatus) -> Vec<VideoStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(next))
            .collect()
    }

    /// A job for this video is queued or running.
    pub fn is_active(&self) -> bool {
        matches!(self, VideoStatus::Pending | VideoStatus::Downloading)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VideoStatus::Pending),
            "downloading" => Ok(VideoStatus::Downloading),
            "complete" => Ok(VideoStatus::Complete),
            "failed" => Ok(VideoStatus::Failed),
            "cancelled" => Ok(VideoStatus::Cancelled),
            other => Err(format!("unknown video status: {}", other)),
        }
    }
}

/// A persisted video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub channel_id: Option<String>,
    pub duration_seconds: Option<i64>,
    pub upload_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub is_favorite: bool,
    pub status: VideoStatus,
    pub file_size_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

/// Fields known at ingest time, before anything is downloaded.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub channel_id: Option<String>,
    pub duration_seconds: Option<i64>,
}

/// Everything written in the single commit that completes a download.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedVideo {
    pub title: String,
    pub channel_name: String,
    pub channel_id: Option<String>,
    pub duration_seconds: Option<i64>,
    pub upload_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub file_size_bytes: u64,
}
