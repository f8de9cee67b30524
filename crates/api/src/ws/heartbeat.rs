use std::sync::Arc;
use std::time::Duration;

use aquamine_events::ClientRegistry;

/// Interval between heartbeat pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn a background task that sends periodic Ping frames to all live
/// clients.
///
/// Runs until aborted through the returned handle during shutdown.
pub fn start_heartbeat(registry: Arc<ClientRegistry>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            let count = registry.ping_all().await;
            tracing::debug!(count, "Live client heartbeat ping");
        }
    })
}
