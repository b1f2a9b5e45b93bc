pub mod config;
pub mod extractor;
pub mod fanout;
pub mod heartbeat;
pub mod media;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod queue;
pub mod signal;
pub mod streaming;
pub mod testing;
pub mod thumbnail;
pub mod video;
pub mod worker;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use extractor::{Extractor, ExtractorError, YtDlpExtractor};
pub use fanout::{LiveMessage, ProgressRelay, SessionRegistry};
pub use heartbeat::{HeartbeatStore, RedisHeartbeatStore, WorkerHeartbeat};
pub use media::MediaLayout;
pub use orchestrator::{DownloadOrchestrator, OrchestratorConfig, OrchestratorError, Outcome};
pub use progress::{ProgressChannel, ProgressEvent, RedisProgressChannel};
pub use queue::{Job, JobQueue, QueueError, QueueStatus, RedisJobQueue, RetryPolicy};
pub use signal::{CancelSignals, RedisCancelSignals, SignalError};
pub use streaming::{StreamError, StreamingEngine};
pub use thumbnail::{FsThumbnailProcessor, ThumbnailProcessor};
pub use video::{SqliteVideoStore, VideoError, VideoRecord, VideoStatus, VideoStore};
pub use worker::Worker;
