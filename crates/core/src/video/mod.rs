//! Video records: the persisted lifecycle state of every archived video.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteVideoStore;
pub use store::{VideoError, VideoStore};
pub use types::{CompletedVideo, NewVideo, VideoRecord, VideoStatus};
