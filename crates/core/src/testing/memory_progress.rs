//! In-memory progress channel.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;

use crate::progress::{ProgressChannel, ProgressError, ProgressEvent};

/// Progress channel over a tokio broadcast channel, recording every publish.
pub struct MemoryProgressChannel {
    tx: broadcast::Sender<ProgressEvent>,
    published: Mutex<Vec<ProgressEvent>>,
}

impl Default for MemoryProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProgressChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self {
            tx,
            published: Mutex::new(Vec::new()),
        }
    }

    /// Every event published so far, in order.
    pub fn published(&self) -> Vec<ProgressEvent> {
        self.published.lock().unwrap().clone()
    }

    /// Events published for one video.
    pub fn published_for(&self, video_id: &str) -> Vec<ProgressEvent> {
        self.published()
            .into_iter()
            .filter(|e| e.video_id == video_id)
            .collect()
    }

    /// Publish without going through the trait, for driving subscribers.
    pub fn inject(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl ProgressChannel for MemoryProgressChannel {
    async fn publish(&self, event: &ProgressEvent) -> Result<(), ProgressError> {
        self.published.lock().unwrap().push(event.clone());
        // No subscribers is not an error for pub/sub.
        let _ = self.tx.send(event.clone());
        Ok(())
    }

    async fn subscribe_all(&self) -> Result<BoxStream<'static, ProgressEvent>, ProgressError> {
        let rx = self.tx.subscribe();
        let events = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(events.boxed())
    }
}
