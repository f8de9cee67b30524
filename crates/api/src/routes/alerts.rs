use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Alert routes mounted at `/alerts`.
///
/// ```text
/// GET  /                   -> list_alerts
/// GET  /summary            -> alert_summary
/// GET  /states             -> list_states
/// GET  /{id}               -> get_alert
/// POST /{id}/acknowledge   -> acknowledge_alert
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(alerts::list_alerts))
        .route("/summary", get(alerts::alert_summary))
        .route("/states", get(alerts::list_states))
        .route("/{id}", get(alerts::get_alert))
        .route("/{id}/acknowledge", post(alerts::acknowledge_alert))
}
