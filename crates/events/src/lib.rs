//! AquaMine live events and notifications.
//!
//! - [`pubsub`] -- broker-agnostic publish/subscribe transport with Redis and
//!   in-process implementations.
//! - [`EventPublisher`] -- publishes reading and alert events.
//! - [`live`] -- the live-dashboard client registry and the fan-out loop
//!   that forwards every pub/sub message to every local client.
//! - [`delivery`] -- outbound notification channels (WhatsApp, email).
//! - [`NotificationDispatcher`] -- per-recipient, per-channel fan-out with
//!   failure isolation.
//! - [`NotificationQueue`] -- bounded background queue running dispatches.

pub mod delivery;
pub mod dispatcher;
pub mod live;
pub mod publisher;
pub mod pubsub;
pub mod queue;

pub use live::{ClientFrame, ClientRegistry, FanOut};
pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use publisher::EventPublisher;
pub use pubsub::{LocalPubSub, PubSubError, PubSubMessage, PubSubTransport, RedisPubSub};
pub use queue::{NotificationQueue, QueueConfig, QueueWorker};
