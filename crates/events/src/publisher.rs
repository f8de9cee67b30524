//! Publishes pipeline events to the pub/sub transport.
//!
//! Publishing is best-effort: failures are logged and reported as `false`,
//! never raised into the evaluation path.

use std::sync::Arc;

use serde::Serialize;

use aquamine_core::alert::AlertEvent;
use aquamine_core::channels::EventKind;
use aquamine_core::reading::Reading;

use crate::pubsub::{PubSubError, PubSubTransport};

#[derive(Clone)]
pub struct EventPublisher {
    transport: Arc<dyn PubSubTransport>,
}

impl EventPublisher {
    pub fn new(transport: Arc<dyn PubSubTransport>) -> Self {
        Self { transport }
    }

    pub async fn publish_reading(&self, reading: &Reading) -> bool {
        self.publish(EventKind::Reading, reading).await
    }

    pub async fn publish_alert(&self, event: &AlertEvent) -> bool {
        self.publish(EventKind::Alert, event).await
    }

    async fn publish<T: Serialize + Sync>(&self, kind: EventKind, payload: &T) -> bool {
        let channel = kind.channel();
        match self.try_publish(channel, payload).await {
            Ok(()) => {
                tracing::trace!(channel, "Event published");
                true
            }
            Err(e) => {
                tracing::warn!(channel, error = %e, "Failed to publish event");
                false
            }
        }
    }

    async fn try_publish<T: Serialize + Sync>(
        &self,
        channel: &str,
        payload: &T,
    ) -> Result<(), PubSubError> {
        let json = serde_json::to_string(payload)?;
        self.transport.publish(channel, json).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
