//! Worker liveness registry.
//!
//! Each worker keeps a TTL key alive under `vidkeep:worker:{id}`. A clean
//! shutdown deletes the key; a crashed worker ages out once the TTL lapses.

mod redis_store;
mod registry;

pub use redis_store::RedisHeartbeatStore;
pub use registry::{generate_worker_id, WorkerHeartbeat};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Namespace prefix for heartbeat keys.
pub const WORKER_KEY_PREFIX: &str = "vidkeep:worker:";

pub fn worker_key(worker_id: &str) -> String {
    format!("{}{}", WORKER_KEY_PREFIX, worker_id)
}

#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("heartbeat store error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for HeartbeatError {
    fn from(e: redis::RedisError) -> Self {
        HeartbeatError::Backend(e.to_string())
    }
}

/// TTL-keyed storage for heartbeats.
#[async_trait]
pub trait HeartbeatStore: Send + Sync {
    /// Write or refresh the worker's key with a fresh TTL.
    async fn beat(&self, worker_id: &str, ttl: Duration) -> Result<(), HeartbeatError>;

    /// Delete the worker's key.
    async fn remove(&self, worker_id: &str) -> Result<(), HeartbeatError>;

    /// Identifiers of every worker whose key has not expired, sorted.
    async fn live_workers(&self) -> Result<Vec<String>, HeartbeatError>;
}
