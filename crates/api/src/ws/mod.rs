//! Live-dashboard WebSocket endpoint.
//!
//! Connections are registered with the shared
//! [`ClientRegistry`](aquamine_events::ClientRegistry), which the live
//! fan-out feeds. Inbound frames are keep-alive only.

mod handler;
mod heartbeat;

pub use handler::ws_handler;
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
