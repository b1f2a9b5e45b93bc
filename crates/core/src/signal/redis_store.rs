use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{cancel_key, CancelSignals, SignalError};

/// Cancellation signals stored as plain Redis keys with no expiry.
#[derive(Clone)]
pub struct RedisCancelSignals {
    conn: ConnectionManager,
}

impl RedisCancelSignals {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CancelSignals for RedisCancelSignals {
    async fn request(&self, video_id: &str) -> Result<bool, SignalError> {
        let mut conn = self.conn.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(cancel_key(video_id))
            .arg("1")
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(set.is_some())
    }

    async fn consume(&self, video_id: &str) -> Result<bool, SignalError> {
        let mut conn = self.conn.clone();
        // DEL is atomic; only one caller can observe a removed count of 1.
        let removed: i64 = conn.del(cancel_key(video_id)).await?;
        Ok(removed > 0)
    }

    async fn is_requested(&self, video_id: &str) -> Result<bool, SignalError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(cancel_key(video_id)).await?;
        Ok(exists)
    }
}
