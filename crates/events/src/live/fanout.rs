use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use aquamine_core::channels::EventKind;
use aquamine_core::types::Timestamp;

use super::registry::{ClientFrame, ClientRegistry};
use crate::pubsub::{MessageStream, PubSubError, PubSubMessage, PubSubTransport};

/// Delay before the first attempt to resubscribe after the stream ends.
const RESUBSCRIBE_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the delay between resubscribe attempts.
const RESUBSCRIBE_MAX_DELAY: Duration = Duration::from_secs(30);

fn channel_names() -> Vec<&'static str> {
    EventKind::ALL.iter().map(|k| k.channel()).collect()
}

/// Frame sent to live-dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEnvelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: Timestamp,
    pub data: serde_json::Value,
}

impl LiveEnvelope {
    /// Wrap a pub/sub message. Returns `None` for unknown channels or
    /// payloads that are not JSON.
    pub fn from_message(msg: &PubSubMessage) -> Option<Self> {
        let Some(kind) = EventKind::from_channel(&msg.channel) else {
            tracing::debug!(channel = %msg.channel, "Ignoring message on unknown channel");
            return None;
        };
        match serde_json::from_str(&msg.payload) {
            Ok(data) => Some(Self {
                kind,
                timestamp: Utc::now(),
                data,
            }),
            Err(e) => {
                tracing::warn!(channel = %msg.channel, error = %e, "Dropping non-JSON pub/sub payload");
                None
            }
        }
    }
}

/// Forwards pub/sub messages to every locally connected client.
pub struct FanOut {
    transport: Arc<dyn PubSubTransport>,
    registry: Arc<ClientRegistry>,
}

impl FanOut {
    pub fn new(transport: Arc<dyn PubSubTransport>, registry: Arc<ClientRegistry>) -> Self {
        Self { transport, registry }
    }

    /// Subscribe to the reading and alert channels.
    ///
    /// Subscribing happens before [`run`](Self::run) so a failure surfaces at
    /// startup rather than inside a background task.
    pub async fn subscribe(self) -> Result<Subscribed, PubSubError> {
        let channels = channel_names();
        let stream = self.transport.subscribe(&channels).await?;
        tracing::info!(?channels, "Live fan-out subscribed");
        Ok(Subscribed {
            stream,
            transport: self.transport,
            registry: self.registry,
        })
    }
}

/// A fan-out loop with an active subscription.
pub struct Subscribed {
    stream: MessageStream,
    transport: Arc<dyn PubSubTransport>,
    registry: Arc<ClientRegistry>,
}

impl Subscribed {
    /// Run until cancelled. A subscription that ends (broker restart, lost
    /// connection) is re-established with exponential backoff.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => break,
                msg = self.stream.next() => msg,
            };
            let Some(msg) = msg else {
                tracing::error!("Live fan-out subscription ended, resubscribing");
                match self.resubscribe(&cancel).await {
                    Some(stream) => {
                        self.stream = stream;
                        continue;
                    }
                    None => break,
                }
            };
            let Some(envelope) = LiveEnvelope::from_message(&msg) else {
                continue;
            };
            let text = match serde_json::to_string(&envelope) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode live envelope");
                    continue;
                }
            };
            let delivered = self.registry.broadcast(ClientFrame::Text(Arc::from(text))).await;
            tracing::trace!(channel = %msg.channel, delivered, "Live message fanned out");
        }
        tracing::info!("Live fan-out stopped");
    }

    /// Retry `subscribe` until it succeeds. Returns `None` if cancelled first.
    async fn resubscribe(&mut self, cancel: &CancellationToken) -> Option<MessageStream> {
        let channels = channel_names();
        let mut delay = RESUBSCRIBE_INITIAL_DELAY;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
            match self.transport.subscribe(&channels).await {
                Ok(stream) => {
                    tracing::info!(attempt, "Live fan-out resubscribed");
                    return Some(stream);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Live fan-out resubscribe failed"
                    );
                    delay = (delay * 2).min(RESUBSCRIBE_MAX_DELAY);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
