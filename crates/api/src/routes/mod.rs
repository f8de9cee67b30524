pub mod alerts;
pub mod health;
pub mod live;
pub mod recipients;
pub mod sensors;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /sensors                          list registered sensors (GET)
/// /sensors/readings                 ingest a reading (POST)
/// /sensors/{sensor_id}/readings     reading history, newest first (GET)
///
/// /alerts                           list alerts (GET)
/// /alerts/summary                   elevated sensor counts (GET)
/// /alerts/states                    per-sensor alert state (GET)
/// /alerts/{id}                      get alert (GET)
/// /alerts/{id}/acknowledge          acknowledge alert (POST)
///
/// /recipients                       list, create (GET, POST)
/// /recipients/{id}                  deactivate (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sensors", sensors::router())
        .nest("/alerts", alerts::router())
        .nest("/recipients", recipients::router())
}
