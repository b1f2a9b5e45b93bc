//! In-memory job queue.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use crate::queue::{Job, JobQueue, QueueError, QueueStatus};

/// FIFO job queue in process memory.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<VecDeque<Job>>,
    in_progress: Mutex<HashSet<Uuid>>,
    history: Mutex<Vec<Job>>,
    notify: Notify,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every job ever pushed, including re-queued attempts.
    pub fn history(&self) -> Vec<Job> {
        self.history.lock().unwrap().clone()
    }

    /// Jobs waiting to be claimed.
    pub fn pending(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().iter().cloned().collect()
    }

    fn push(&self, job: Job) {
        self.history.lock().unwrap().push(job.clone());
        self.jobs.lock().unwrap().push_back(job);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Job> {
        self.jobs.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, video_id: &str, source_url: &str) -> Result<Uuid, QueueError> {
        let job = Job::new(video_id, source_url);
        let id = job.job_id;
        self.push(job);
        Ok(id)
    }

    async fn requeue(&self, job: Job) -> Result<(), QueueError> {
        self.push(job);
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<Job>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(job) = self.pop() {
                return Ok(Some(job));
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(self.pop());
            }
        }
    }

    async fn mark_started(&self, job: &Job) -> Result<(), QueueError> {
        self.in_progress.lock().unwrap().insert(job.job_id);
        Ok(())
    }

    async fn mark_finished(&self, job: &Job) -> Result<(), QueueError> {
        self.in_progress.lock().unwrap().remove(&job.job_id);
        Ok(())
    }

    async fn status(&self) -> Result<QueueStatus, QueueError> {
        let pending = self.jobs.lock().unwrap().len() as u64;
        let processing = self.in_progress.lock().unwrap().len() as u64;
        Ok(QueueStatus::new(pending, processing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order_and_status() {
        let queue = MemoryJobQueue::new();
        queue.enqueue("a", "https://youtu.be/a").await.unwrap();
        queue.enqueue("b", "https://youtu.be/b").await.unwrap();
        assert_eq!(queue.status().await.unwrap(), QueueStatus::new(2, 0));

        let job = queue.dequeue(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(job.video_id, "a");
        queue.mark_started(&job).await.unwrap();
        assert_eq!(queue.status().await.unwrap(), QueueStatus::new(1, 1));
        queue.mark_finished(&job).await.unwrap();
        assert_eq!(queue.status().await.unwrap().processing, 0);
    }

    #[tokio::test]
    async fn test_dequeue_times_out_when_empty() {
        let queue = MemoryJobQueue::new();
        let started = std::time::Instant::now();
        assert!(queue.dequeue(Duration::from_millis(50)).await.unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_push() {
        let queue = std::sync::Arc::new(MemoryJobQueue::new());
        let producer = std::sync::Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.enqueue("late", "https://youtu.be/late").await.unwrap();
        });
        let job = queue.dequeue(Duration::from_secs(5)).await.unwrap();
        assert_eq!(job.map(|j| j.video_id).as_deref(), Some("late"));
    }
}
