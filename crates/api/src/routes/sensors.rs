use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sensors;
use crate::state::AppState;

/// Sensor routes mounted at `/sensors`.
///
/// ```text
/// GET  /                      -> list_sensors
/// POST /readings              -> ingest_reading
/// GET  /{sensor_id}/readings  -> list_readings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sensors::list_sensors))
        .route("/readings", post(sensors::ingest_reading))
        .route("/{sensor_id}/readings", get(sensors::list_readings))
}
