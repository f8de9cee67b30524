use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::recipients;
use crate::state::AppState;

/// Recipient routes mounted at `/recipients`.
///
/// ```text
/// GET    /       -> list_recipients
/// POST   /       -> create_recipient
/// DELETE /{id}   -> deactivate_recipient
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(recipients::list_recipients).post(recipients::create_recipient),
        )
        .route("/{id}", delete(recipients::deactivate_recipient))
}
