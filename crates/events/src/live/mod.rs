//! Live-dashboard fan-out.
//!
//! [`ClientRegistry`] tracks locally connected clients; [`FanOut`] subscribes
//! once to the pub/sub channels and forwards every message to every client.

mod fanout;
mod registry;

pub use fanout::{FanOut, LiveEnvelope, Subscribed};
pub use registry::{ClientFrame, ClientRegistry, RegistryConfig};
