//! Per-video cancellation signals.
//!
//! A signal is write-once and consume-once: the first reader that removes it
//! owns the cancellation, every later reader sees nothing.

mod redis_store;

pub use redis_store::RedisCancelSignals;

use async_trait::async_trait;
use thiserror::Error;

/// Key under which the cancel flag for `video_id` lives.
pub fn cancel_key(video_id: &str) -> String {
    format!("cancel:{}", video_id)
}

/// Errors from the signal store.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signal store error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for SignalError {
    fn from(e: redis::RedisError) -> Self {
        SignalError::Backend(e.to_string())
    }
}

/// Shared store of cancellation requests.
#[async_trait]
pub trait CancelSignals: Send + Sync {
    /// Request cancellation. Returns `true` if the flag was newly set.
    async fn request(&self, video_id: &str) -> Result<bool, SignalError>;

    /// Remove the flag. Returns `true` only for the caller that removed it.
    async fn consume(&self, video_id: &str) -> Result<bool, SignalError>;

    /// Whether a request is pending, without consuming it.
    async fn is_requested(&self, video_id: &str) -> Result<bool, SignalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_key_format() {
        assert_eq!(cancel_key("dQw4w9WgXcQ"), "cancel:dQw4w9WgXcQ");
    }
}
