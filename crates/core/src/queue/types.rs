use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::WorkerConfig;

/// One attempt at downloading a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub video_id: String,
    pub source_url: String,
    /// 1-based attempt counter.
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    pub fn new(video_id: &str, source_url: &str) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            video_id: video_id.to_string(),
            source_url: source_url.to_string(),
            attempt: 1,
            enqueued_at: Utc::now(),
        }
    }

    /// Same job, following attempt.
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            enqueued_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// Queue depth as reported to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: u64,
    pub processing: u64,
    pub total: u64,
}

impl QueueStatus {
    pub fn new(pending: u64, processing: u64) -> Self {
        Self {
            pending,
            processing,
            total: pending + processing,
        }
    }
}

/// Attempt ceiling and per-attempt wall-clock limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_tries: u32,
    pub job_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 3,
            job_timeout: Duration::from_secs(3600),
        }
    }
}

impl From<&WorkerConfig> for RetryPolicy {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_tries: config.max_tries,
            job_timeout: config.job_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Whether a job that just failed on `attempt` gets another one.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_tries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_attempt_keeps_job_id() {
        let job = Job::new("abc", "https://youtu.be/abc");
        let next = job.next_attempt();
        assert_eq!(next.job_id, job.job_id);
        assert_eq!(next.attempt, 2);
        assert_eq!(next.video_id, "abc");
    }

    #[test]
    fn test_retry_ceiling_counts_first_attempt() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_queue_status_total() {
        let status = QueueStatus::new(4, 2);
        assert_eq!(status.total, 6);
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["pending"], 4);
        assert_eq!(json["processing"], 2);
    }

    #[test]
    fn test_job_serde_round_trip_preserves_attempt() {
        let job = Job::new("abc", "https://youtu.be/abc").next_attempt();
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
