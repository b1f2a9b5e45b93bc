//! Progress events and the publish/subscribe channel that carries them.

mod event;
mod redis_channel;

pub use event::{progress_topic, ProgressEvent, ProgressPayload, PROGRESS_TOPIC_PATTERN};
pub use redis_channel::RedisProgressChannel;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Errors from the progress channel.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("progress channel error: {0}")]
    Backend(String),

    #[error("malformed progress payload on {topic}: {reason}")]
    Malformed { topic: String, reason: String },
}

impl From<redis::RedisError> for ProgressError {
    fn from(e: redis::RedisError) -> Self {
        ProgressError::Backend(e.to_string())
    }
}

/// Publish/subscribe fabric keyed per video under `progress:*`.
#[async_trait]
pub trait ProgressChannel: Send + Sync {
    /// Publish an event on the video's topic.
    async fn publish(&self, event: &ProgressEvent) -> Result<(), ProgressError>;

    /// Subscribe to every video's topic with a single pattern subscription.
    ///
    /// Malformed payloads are skipped; the stream ends when the subscription
    /// connection is lost.
    async fn subscribe_all(&self) -> Result<BoxStream<'static, ProgressEvent>, ProgressError>;
}
