use serde::{Deserialize, Serialize};

use crate::progress::ProgressEvent;

/// Message pushed to live-update sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveMessage {
    Progress {
        video_id: String,
        percent: u8,
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
    },
}

impl From<ProgressEvent> for LiveMessage {
    fn from(event: ProgressEvent) -> Self {
        LiveMessage::Progress {
            video_id: event.video_id,
            percent: event.percent,
            downloaded_bytes: event.downloaded_bytes,
            total_bytes: event.total_bytes,
        }
    }
}

impl LiveMessage {
    pub fn to_json(&self) -> String {
        // Serializing a plain enum of strings and integers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_message_schema() {
        let msg = LiveMessage::from(ProgressEvent::from_tick("abc", 50, Some(200)));
        let json: serde_json::Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "progress",
                "video_id": "abc",
                "percent": 25,
                "downloaded_bytes": 50,
                "total_bytes": 200,
            })
        );
    }

    #[test]
    fn test_unknown_total_serializes_as_null() {
        let msg = LiveMessage::from(ProgressEvent::from_tick("abc", 50, None));
        let json: serde_json::Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert!(json["total_bytes"].is_null());
        assert_eq!(json["percent"], 0);
    }
}
