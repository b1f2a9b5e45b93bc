//! In-memory heartbeat store with real TTL expiry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::heartbeat::{HeartbeatError, HeartbeatStore};

#[derive(Debug, Default)]
pub struct MemoryHeartbeatStore {
    expiries: Mutex<HashMap<String, Instant>>,
    beats: Mutex<HashMap<String, usize>>,
    fail: Mutex<bool>,
}

impl MemoryHeartbeatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes for `worker_id`, including the initial one.
    pub fn beat_count(&self, worker_id: &str) -> usize {
        self.beats
            .lock()
            .unwrap()
            .get(worker_id)
            .copied()
            .unwrap_or(0)
    }

    /// Whether the key exists and has not expired.
    pub fn is_live(&self, worker_id: &str) -> bool {
        self.expiries
            .lock()
            .unwrap()
            .get(worker_id)
            .is_some_and(|expiry| *expiry > Instant::now())
    }

    /// Make every call fail, as if the store were unreachable.
    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }

    fn check(&self) -> Result<(), HeartbeatError> {
        if *self.fail.lock().unwrap() {
            return Err(HeartbeatError::Backend("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HeartbeatStore for MemoryHeartbeatStore {
    async fn beat(&self, worker_id: &str, ttl: Duration) -> Result<(), HeartbeatError> {
        self.check()?;
        self.expiries
            .lock()
            .unwrap()
            .insert(worker_id.to_string(), Instant::now() + ttl);
        *self
            .beats
            .lock()
            .unwrap()
            .entry(worker_id.to_string())
            .or_default() += 1;
        Ok(())
    }

    async fn remove(&self, worker_id: &str) -> Result<(), HeartbeatError> {
        self.check()?;
        self.expiries.lock().unwrap().remove(worker_id);
        Ok(())
    }

    async fn live_workers(&self) -> Result<Vec<String>, HeartbeatError> {
        self.check()?;
        let now = Instant::now();
        let mut expiries = self.expiries.lock().unwrap();
        expiries.retain(|_, expiry| *expiry > now);
        let mut ids: Vec<String> = expiries.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
