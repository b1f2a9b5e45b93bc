//! In-memory cancellation signals.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::signal::{CancelSignals, SignalError};

/// Cancellation signals in a process-local set.
#[derive(Debug, Default)]
pub struct MemoryCancelSignals {
    flags: Mutex<HashSet<String>>,
    consumed: Mutex<HashMap<String, usize>>,
    fail: Mutex<bool>,
}

impl MemoryCancelSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a set flag was consumed for `video_id`.
    pub fn consumed_count(&self, video_id: &str) -> usize {
        self.consumed
            .lock()
            .unwrap()
            .get(video_id)
            .copied()
            .unwrap_or(0)
    }

    /// Set the flag without going through the trait, for use from blocking
    /// contexts such as extractor hooks.
    pub fn raise(&self, video_id: &str) {
        self.flags.lock().unwrap().insert(video_id.to_string());
    }

    /// Make every call fail, as if the store were unreachable.
    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }

    fn check(&self) -> Result<(), SignalError> {
        if *self.fail.lock().unwrap() {
            return Err(SignalError::Backend("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CancelSignals for MemoryCancelSignals {
    async fn request(&self, video_id: &str) -> Result<bool, SignalError> {
        self.check()?;
        Ok(self.flags.lock().unwrap().insert(video_id.to_string()))
    }

    async fn consume(&self, video_id: &str) -> Result<bool, SignalError> {
        self.check()?;
        let removed = self.flags.lock().unwrap().remove(video_id);
        if removed {
            *self
                .consumed
                .lock()
                .unwrap()
                .entry(video_id.to_string())
                .or_default() += 1;
        }
        Ok(removed)
    }

    async fn is_requested(&self, video_id: &str) -> Result<bool, SignalError> {
        self.check()?;
        Ok(self.flags.lock().unwrap().contains(video_id))
    }
}
