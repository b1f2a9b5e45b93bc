use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{HeartbeatError, HeartbeatStore};
use crate::metrics;

/// Process-unique worker identifier: `{hostname}-{pid}-{8 hex chars}`.
pub fn generate_worker_id() -> String {
    let host = std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "worker".to_string());
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", host.trim(), std::process::id(), &suffix[..8])
}

/// A running heartbeat for one worker.
///
/// Dropping it without [`stop`](Self::stop) leaves the key to expire on its own.
pub struct WorkerHeartbeat {
    worker_id: String,
    store: Arc<dyn HeartbeatStore>,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WorkerHeartbeat {
    /// Write the first heartbeat, then refresh it every `interval`.
    pub async fn start(
        store: Arc<dyn HeartbeatStore>,
        worker_id: String,
        ttl: Duration,
        interval: Duration,
    ) -> Result<Self, HeartbeatError> {
        store.beat(&worker_id, ttl).await?;
        metrics::HEARTBEAT_WRITES.with_label_values(&["ok"]).inc();
        info!(worker_id = %worker_id, ttl_secs = ttl.as_secs(), "Worker heartbeat registered");

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task_store = Arc::clone(&store);
        let task_id = worker_id.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial write already happened.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        match task_store.beat(&task_id, ttl).await {
                            Ok(()) => {
                                metrics::HEARTBEAT_WRITES.with_label_values(&["ok"]).inc();
                                debug!(worker_id = %task_id, "Heartbeat refreshed");
                            }
                            Err(e) => {
                                metrics::HEARTBEAT_WRITES.with_label_values(&["error"]).inc();
                                warn!(worker_id = %task_id, error = %e, "Heartbeat refresh failed");
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            worker_id,
            store,
            stop_tx,
            task,
        })
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Stop refreshing, wait for the refresh task to end, then delete the key.
    pub async fn stop(self) -> Result<(), HeartbeatError> {
        let Self {
            worker_id,
            store,
            stop_tx,
            task,
        } = self;

        let _ = stop_tx.send(());
        if let Err(e) = task.await {
            warn!(worker_id = %worker_id, error = %e, "Heartbeat task ended abnormally");
        }
        store.remove(&worker_id).await?;
        info!(worker_id = %worker_id, "Worker heartbeat removed");
        Ok(())
    }
}
