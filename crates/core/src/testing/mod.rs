//! Testing utilities and in-memory implementations of every external seam.
//!
//! Nothing here needs Redis or yt-dlp, so the whole job lifecycle can be
//! exercised in-process.
//!
//! # Example
//!
//! ```rust,ignore
//! use vidkeep_core::testing::{MemoryCancelSignals, MemoryProgressChannel, MockExtractor};
//!
//! let signals = MemoryCancelSignals::new();
//! let progress = MemoryProgressChannel::new();
//! let extractor = MockExtractor::new().then(ScriptedOutcome::Fail("boom".into()));
//! ```

mod memory_heartbeat;
mod memory_progress;
mod memory_queue;
mod memory_signals;
mod mock_extractor;

pub use memory_heartbeat::MemoryHeartbeatStore;
pub use memory_progress::MemoryProgressChannel;
pub use memory_queue::MemoryJobQueue;
pub use memory_signals::MemoryCancelSignals;
pub use mock_extractor::{MockExtractor, ScriptedOutcome};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::extractor::{ExtractedInfo, ProgressTick};
    use crate::video::NewVideo;

    /// Info document for a well-formed video.
    pub fn extracted_info(video_id: &str) -> ExtractedInfo {
        ExtractedInfo {
            id: Some(video_id.to_string()),
            title: Some(format!("Video {}", video_id)),
            channel: Some("Test Channel".to_string()),
            uploader: Some("test-uploader".to_string()),
            channel_id: Some("UCtestchannel".to_string()),
            duration: Some(212.0),
            upload_date: Some("20240131".to_string()),
            description: Some("A test video".to_string()),
        }
    }

    /// Pending record fields for `video_id`.
    pub fn new_video(video_id: &str) -> NewVideo {
        NewVideo {
            video_id: video_id.to_string(),
            title: format!("Video {}", video_id),
            channel_name: "Test Channel".to_string(),
            channel_id: Some("UCtestchannel".to_string()),
            duration_seconds: Some(212),
        }
    }

    /// `count` evenly spaced ticks ending at `total`.
    pub fn ticks(count: u64, total: u64) -> Vec<ProgressTick> {
        (1..=count)
            .map(|i| ProgressTick {
                downloaded_bytes: total * i / count,
                total_bytes: Some(total),
            })
            .collect()
    }
}
