use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

use super::{ProgressChannel, ProgressError, ProgressEvent, PROGRESS_TOPIC_PATTERN};

/// Progress channel over Redis pub/sub.
///
/// Publishing goes through the shared connection manager; each subscription
/// opens its own dedicated pub/sub connection from the client.
#[derive(Clone)]
pub struct RedisProgressChannel {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisProgressChannel {
    pub fn new(client: redis::Client, conn: ConnectionManager) -> Self {
        Self { client, conn }
    }
}

#[async_trait]
impl ProgressChannel for RedisProgressChannel {
    async fn publish(&self, event: &ProgressEvent) -> Result<(), ProgressError> {
        let payload = serde_json::to_string(&event.payload()).map_err(|e| {
            ProgressError::Malformed {
                topic: event.topic(),
                reason: e.to_string(),
            }
        })?;
        let mut conn = self.conn.clone();
        let _receivers: i64 = conn.publish(event.topic(), payload).await?;
        Ok(())
    }

    async fn subscribe_all(&self) -> Result<BoxStream<'static, ProgressEvent>, ProgressError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe(PROGRESS_TOPIC_PATTERN).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let topic = msg.get_channel_name().to_string();
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    warn!(topic = %topic, error = %e, "Non-text progress payload");
                    return None;
                }
            };
            match ProgressEvent::from_message(&topic, &payload) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed progress message");
                    None
                }
            }
        });

        Ok(stream.boxed())
    }
}
