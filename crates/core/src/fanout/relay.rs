use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{LiveMessage, SessionRegistry};
use crate::progress::ProgressChannel;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Bridges the progress channel to the session registry.
pub struct ProgressRelay {
    channel: Arc<dyn ProgressChannel>,
    registry: SessionRegistry,
}

impl ProgressRelay {
    pub fn new(channel: Arc<dyn ProgressChannel>, registry: SessionRegistry) -> Self {
        Self { channel, registry }
    }

    /// Relay until `shutdown` fires, resubscribing with backoff whenever the
    /// subscription drops.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let mut events = match self.channel.subscribe_all().await {
                Ok(events) => {
                    info!("Progress relay subscribed");
                    backoff = INITIAL_BACKOFF;
                    events
                }
                Err(e) => {
                    warn!(error = %e, retry_in_ms = backoff.as_millis() as u64, "Progress subscription failed");
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        info!("Progress relay stopping");
                        return;
                    }
                    next = events.next() => match next {
                        Some(event) => {
                            let video_id = event.video_id.clone();
                            let delivered = self.registry.broadcast(&LiveMessage::from(event)).await;
                            debug!(video_id = %video_id, delivered, "Relayed progress event");
                        }
                        None => {
                            warn!("Progress subscription ended; resubscribing");
                            break;
                        }
                    }
                }
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
        }

        info!("Progress relay stopping");
    }
}
