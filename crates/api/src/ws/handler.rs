use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use aquamine_events::{ClientFrame, ClientRegistry};

use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.registry))
}

fn to_message(frame: ClientFrame) -> Message {
    match frame {
        ClientFrame::Text(text) => Message::Text(text.as_ref().into()),
        ClientFrame::Ping => Message::Ping(Bytes::new()),
        ClientFrame::Close => Message::Close(None),
    }
}

/// Manage a single WebSocket connection after upgrade.
///
/// A sender task forwards the registry's frames to the socket while the
/// current task reads inbound frames. Whichever side finishes first ends the
/// connection, and the client is always deregistered before returning.
async fn handle_socket(socket: WebSocket, registry: Arc<ClientRegistry>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let mut rx = registry.add(conn_id.clone()).await;
    tracing::info!(conn_id = %conn_id, "Live client connected");

    let (mut sink, mut stream) = socket.split();

    // The registry drops our sender when it evicts this client, which ends
    // the loop.
    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let closing = frame == ClientFrame::Close;
            if sink.send(to_message(frame)).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "Live client sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let recv_conn_id = conn_id.clone();
    let receive = async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(Message::Pong(_)) => {
                    tracing::trace!(conn_id = %recv_conn_id, "Pong received");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(conn_id = %recv_conn_id, error = %e, "Live client receive error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = &mut send_task => {}
        () = receive => {}
    }

    registry.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "Live client disconnected");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
