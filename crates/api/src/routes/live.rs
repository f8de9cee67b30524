use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Live-dashboard WebSocket, mounted at the root.
///
/// ```text
/// GET /ws/realtime   -> ws_handler (upgrade)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/ws/realtime", get(ws::ws_handler))
}
