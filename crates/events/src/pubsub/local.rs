//! In-process transport backed by a `tokio::sync::broadcast` channel.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use super::{MessageStream, PubSubError, PubSubMessage, PubSubTransport};

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Single-process pub/sub.
///
/// Slow subscribers that fall more than the channel capacity behind skip the
/// missed messages; delivery is best-effort.
pub struct LocalPubSub {
    sender: broadcast::Sender<PubSubMessage>,
}

impl LocalPubSub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for LocalPubSub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl PubSubTransport for LocalPubSub {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), PubSubError> {
        // A send error only means there are no subscribers.
        let _ = self.sender.send(PubSubMessage {
            channel: channel.to_string(),
            payload,
        });
        Ok(())
    }

    async fn subscribe(&self, channels: &[&str]) -> Result<MessageStream, PubSubError> {
        let wanted: HashSet<String> = channels.iter().map(|c| c.to_string()).collect();
        let stream = BroadcastStream::new(self.sender.subscribe()).filter_map(move |item| {
            let keep = match item {
                Ok(msg) if wanted.contains(&msg.channel) => Some(msg),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Local pub/sub subscriber lagged, messages dropped");
                    None
                }
            };
            futures::future::ready(keep)
        });
        Ok(stream.boxed())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
