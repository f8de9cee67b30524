use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aquamine_core::types::Timestamp;
use futures::future::join_all;
use tokio::sync::{mpsc, RwLock};

/// Default number of frames buffered per client.
const DEFAULT_CLIENT_BUFFER: usize = 64;

/// Default time a slow client may hold up a single send.
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(2000);

/// A frame queued for one client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(Arc<str>),
    Ping,
    Close,
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub client_buffer: usize,
    pub send_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            client_buffer: DEFAULT_CLIENT_BUFFER,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

struct ClientConnection {
    sender: mpsc::Sender<ClientFrame>,
    /// Used in disconnect logs.
    connected_at: Timestamp,
}

/// All live clients connected to this process.
///
/// Each client has a bounded outbound buffer. A client whose buffer stays
/// full for longer than the send timeout, or whose connection is gone, is
/// dropped from the registry; other clients are unaffected.
pub struct ClientRegistry {
    config: RegistryConfig,
    connections: RwLock<HashMap<String, ClientConnection>>,
}

impl ClientRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a client and return the receiver for its outbound frames.
    pub async fn add(&self, conn_id: String) -> mpsc::Receiver<ClientFrame> {
        let (sender, rx) = mpsc::channel(self.config.client_buffer.max(1));
        let conn = ClientConnection {
            sender,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Deregister a client. Dropping its sender ends its outbound stream.
    pub async fn remove(&self, conn_id: &str) -> bool {
        match self.connections.write().await.remove(conn_id) {
            Some(conn) => {
                let connected_for = chrono::Utc::now() - conn.connected_at;
                tracing::debug!(
                    conn_id,
                    connected_secs = connected_for.num_seconds(),
                    "Live client removed"
                );
                true
            }
            None => false,
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send `frame` to every client. Returns how many clients accepted it.
    ///
    /// Senders are snapshotted first so no lock is held while waiting on a
    /// slow client.
    pub async fn broadcast(&self, frame: ClientFrame) -> usize {
        let targets: Vec<(String, mpsc::Sender<ClientFrame>)> = self
            .connections
            .read()
            .await
            .iter()
            .map(|(id, conn)| (id.clone(), conn.sender.clone()))
            .collect();

        let timeout = self.config.send_timeout;
        let results = join_all(targets.into_iter().map(|(id, sender)| {
            let frame = frame.clone();
            async move {
                let ok = sender.send_timeout(frame, timeout).await.is_ok();
                (id, ok)
            }
        }))
        .await;

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, ok) in results {
            if ok {
                delivered += 1;
            } else {
                failed.push(id);
            }
        }

        if !failed.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &failed {
                conns.remove(id);
            }
            tracing::info!(dropped = failed.len(), "Dropped unresponsive live clients");
        }

        delivered
    }

    /// Queue a Ping for every client. Used by the heartbeat task.
    pub async fn ping_all(&self) -> usize {
        self.broadcast(ClientFrame::Ping).await
    }

    /// Send a Close frame to every client, then clear the registry.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.try_send(ClientFrame::Close);
        }
        conns.clear();
        tracing::info!(count, "Closed all live client connections");
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
