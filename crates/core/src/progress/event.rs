use serde::{Deserialize, Serialize};

use super::ProgressError;

/// Pattern matching every progress topic.
pub const PROGRESS_TOPIC_PATTERN: &str = "progress:*";

const TOPIC_PREFIX: &str = "progress:";

/// Topic for one video's progress events.
pub fn progress_topic(video_id: &str) -> String {
    format!("{}{}", TOPIC_PREFIX, video_id)
}

/// A single download progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub video_id: String,
    pub percent: u8,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
}

/// Wire payload; the video id travels in the topic name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub percent: u8,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
}

impl ProgressEvent {
    /// Build an event from raw byte counts.
    ///
    /// `percent` is `floor(downloaded / total * 100)`, capped at 100, and 0
    /// when the total is unknown or zero.
    pub fn from_tick(video_id: &str, downloaded_bytes: u64, total_bytes: Option<u64>) -> Self {
        let percent = match total_bytes {
            Some(total) if total > 0 => {
                let pct = (downloaded_bytes as u128 * 100) / total as u128;
                pct.min(100) as u8
            }
            _ => 0,
        };
        Self {
            video_id: video_id.to_string(),
            percent,
            downloaded_bytes,
            total_bytes,
        }
    }

    pub fn topic(&self) -> String {
        progress_topic(&self.video_id)
    }

    pub fn payload(&self) -> ProgressPayload {
        ProgressPayload {
            percent: self.percent,
            downloaded_bytes: self.downloaded_bytes,
            total_bytes: self.total_bytes,
        }
    }

    /// Reassemble an event from a topic name and its JSON payload.
    pub fn from_message(topic: &str, payload: &str) -> Result<Self, ProgressError> {
        let video_id = topic
            .strip_prefix(TOPIC_PREFIX)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProgressError::Malformed {
                topic: topic.to_string(),
                reason: "not a progress topic".to_string(),
            })?;
        let payload: ProgressPayload =
            serde_json::from_str(payload).map_err(|e| ProgressError::Malformed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            video_id: video_id.to_string(),
            percent: payload.percent,
            downloaded_bytes: payload.downloaded_bytes,
            total_bytes: payload.total_bytes,
        })
    }
}
