use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{worker_key, HeartbeatError, HeartbeatStore, WORKER_KEY_PREFIX};

/// Heartbeats as Redis keys with `EX` expiry.
#[derive(Clone)]
pub struct RedisHeartbeatStore {
    conn: ConnectionManager,
}

impl RedisHeartbeatStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl HeartbeatStore for RedisHeartbeatStore {
    async fn beat(&self, worker_id: &str, ttl: Duration) -> Result<(), HeartbeatError> {
        let mut conn = self.conn.clone();
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = redis::cmd("SET")
            .arg(worker_key(worker_id))
            .arg(Utc::now().to_rfc3339())
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove(&self, worker_id: &str) -> Result<(), HeartbeatError> {
        let mut conn = self.conn.clone();
        let _removed: i64 = conn.del(worker_key(worker_id)).await?;
        Ok(())
    }

    async fn live_workers(&self) -> Result<Vec<String>, HeartbeatError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", WORKER_KEY_PREFIX);
        let mut ids = Vec::new();
        {
            let mut keys = conn.scan_match::<_, String>(pattern).await?;
            while let Some(key) = keys.next_item().await {
                if let Some(id) = key.strip_prefix(WORKER_KEY_PREFIX) {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
