//! Minimal publish/subscribe abstraction.
//!
//! The broadcaster only needs `publish` and `subscribe`, so the broker is
//! swappable: [`RedisPubSub`] keeps several API instances consistent, while
//! [`LocalPubSub`] serves a single instance and tests.

mod local;
mod redis_bus;

pub use local::LocalPubSub;
pub use redis_bus::RedisPubSub;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// One message received from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubMessage {
    pub channel: String,
    /// JSON text as published.
    pub payload: String,
}

/// Stream of messages for a subscription. Ends when the connection is lost.
pub type MessageStream = BoxStream<'static, PubSubMessage>;

#[derive(Debug, thiserror::Error)]
pub enum PubSubError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait PubSubTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), PubSubError>;

    async fn subscribe(&self, channels: &[&str]) -> Result<MessageStream, PubSubError>;
}
