//! Redis pub/sub transport for multi-instance deployments.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::{MessageStream, PubSubError, PubSubMessage, PubSubTransport};

/// Publishes over one multiplexed connection; each `subscribe` opens its own
/// dedicated pub/sub connection.
pub struct RedisPubSub {
    client: redis::Client,
    publisher: MultiplexedConnection,
}

impl RedisPubSub {
    pub async fn connect(url: &str) -> Result<Self, PubSubError> {
        let client = redis::Client::open(url)?;
        let publisher = client.get_multiplexed_async_connection().await?;
        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl PubSubTransport for RedisPubSub {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), PubSubError> {
        let mut conn = self.publisher.clone();
        let _receivers: i64 = conn.publish(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channels: &[&str]) -> Result<MessageStream, PubSubError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for channel in channels {
            pubsub.subscribe(*channel).await?;
        }
        let stream = pubsub.into_on_message().filter_map(|msg| {
            let decoded = match msg.get_payload::<String>() {
                Ok(payload) => Some(PubSubMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                }),
                Err(e) => {
                    tracing::warn!(
                        channel = msg.get_channel_name(),
                        error = %e,
                        "Dropping undecodable Redis message"
                    );
                    None
                }
            };
            futures::future::ready(decoded)
        });
        Ok(stream.boxed())
    }
}
