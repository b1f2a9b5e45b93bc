//! Job queue substrate: submission, claiming, and retry policy.

mod redis_queue;
mod types;

pub use redis_queue::{RedisJobQueue, IN_PROGRESS_KEY, QUEUE_KEY};
pub use types::{Job, QueueStatus, RetryPolicy};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors from the job queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend error: {0}")]
    Backend(String),

    #[error("invalid job payload: {0}")]
    InvalidPayload(String),
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        QueueError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        QueueError::InvalidPayload(e.to_string())
    }
}

/// A FIFO of download jobs shared by the API and every worker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submit a first attempt. Returns the new job id.
    async fn enqueue(&self, video_id: &str, source_url: &str) -> Result<Uuid, QueueError>;

    /// Push an existing job back, typically `job.next_attempt()`.
    async fn requeue(&self, job: Job) -> Result<(), QueueError>;

    /// Claim the oldest job, waiting up to `timeout` for one to arrive.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<Job>, QueueError>;

    /// Record that a claimed job is executing.
    async fn mark_started(&self, job: &Job) -> Result<(), QueueError>;

    /// Record that a job is no longer executing, whatever its outcome.
    async fn mark_finished(&self, job: &Job) -> Result<(), QueueError>;

    /// Queue depth snapshot.
    async fn status(&self) -> Result<QueueStatus, QueueError>;
}
