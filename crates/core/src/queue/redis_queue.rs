use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;
use uuid::Uuid;

use super::{Job, JobQueue, QueueError, QueueStatus};

/// List of serialized jobs. Producers LPUSH, consumers BRPOP.
pub const QUEUE_KEY: &str = "vidkeep:queue";

/// Set of job ids currently executing.
pub const IN_PROGRESS_KEY: &str = "vidkeep:in-progress";

/// Redis list-backed job queue.
///
/// BRPOP holds its connection for the whole wait, so consumers should give
/// the queue a connection manager of its own rather than the shared one.
#[derive(Clone)]
pub struct RedisJobQueue {
    conn: ConnectionManager,
}

impl RedisJobQueue {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn push(&self, job: &Job) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.conn.clone();
        let _len: i64 = conn.lpush(QUEUE_KEY, payload).await?;
        debug!(job_id = %job.job_id, video_id = %job.video_id, attempt = job.attempt, "Job pushed");
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, video_id: &str, source_url: &str) -> Result<Uuid, QueueError> {
        let job = Job::new(video_id, source_url);
        self.push(&job).await?;
        Ok(job.job_id)
    }

    async fn requeue(&self, job: Job) -> Result<(), QueueError> {
        self.push(&job).await
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<Job>, QueueError> {
        let mut conn = self.conn.clone();
        // BRPOP treats 0 as "block forever"; never pass it.
        let secs = timeout.as_secs_f64().max(0.01);
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(QUEUE_KEY)
            .arg(secs)
            .query_async(&mut conn)
            .await?;

        match popped {
            Some((_key, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn mark_started(&self, job: &Job) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _added: i64 = conn.sadd(IN_PROGRESS_KEY, job.job_id.to_string()).await?;
        Ok(())
    }

    async fn mark_finished(&self, job: &Job) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _removed: i64 = conn.srem(IN_PROGRESS_KEY, job.job_id.to_string()).await?;
        Ok(())
    }

    async fn status(&self) -> Result<QueueStatus, QueueError> {
        let mut conn = self.conn.clone();
        let pending: u64 = conn.llen(QUEUE_KEY).await?;
        let processing: u64 = conn.scard(IN_PROGRESS_KEY).await?;
        Ok(QueueStatus::new(pending, processing))
    }
}
