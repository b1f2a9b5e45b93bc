use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{channel, error::TrySendError, Receiver, Sender};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::LiveMessage;
use crate::metrics;

/// Identifier of a registered session.
pub type SessionId = u64;

/// Messages buffered per session before it counts as stalled.
pub const DEFAULT_SESSION_BUFFER: usize = 256;

/// Concurrent set of live-update sessions.
///
/// Each session is a bounded channel sender and delivery uses `try_send`, so
/// a broadcast never waits on a slow client. A session whose receiver is gone
/// or whose buffer is full is removed during the same broadcast; dropping its
/// sender ends the session's socket loop once the buffer drains.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<SessionId, Sender<LiveMessage>>>>,
    next_id: Arc<AtomicU64>,
    buffer: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_SESSION_BUFFER)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose sessions buffer at most `buffer` undelivered messages.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
            buffer: buffer.max(1),
        }
    }

    pub async fn register(&self) -> (SessionId, Receiver<LiveMessage>) {
        let (tx, rx) = channel(self.buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.write().await.insert(id, tx);
        metrics::FANOUT_SESSIONS_TOTAL.inc();
        metrics::FANOUT_SESSIONS_ACTIVE.inc();
        debug!(session_id = id, "Session registered");
        (id, rx)
    }

    pub async fn unregister(&self, id: SessionId) {
        if self.inner.write().await.remove(&id).is_some() {
            metrics::FANOUT_SESSIONS_ACTIVE.dec();
            debug!(session_id = id, "Session unregistered");
        }
    }

    /// Deliver `msg` to every session. Returns how many received it.
    pub async fn broadcast(&self, msg: &LiveMessage) -> usize {
        let mut dead = Vec::new();
        let mut delivered = 0;
        {
            let sessions = self.inner.read().await;
            for (id, tx) in sessions.iter() {
                match tx.try_send(msg.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(session_id = *id, buffer = self.buffer, "Session stalled, dropping it");
                        dead.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => dead.push(*id),
                }
            }
        }

        if !dead.is_empty() {
            let mut sessions = self.inner.write().await;
            for id in dead {
                if sessions.remove(&id).is_some() {
                    metrics::FANOUT_SESSIONS_ACTIVE.dec();
                    metrics::FANOUT_SESSIONS_PRUNED.inc();
                    debug!(session_id = id, "Pruned session");
                }
            }
        }

        metrics::FANOUT_MESSAGES_RELAYED.inc_by(delivered as u64);
        delivered
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
