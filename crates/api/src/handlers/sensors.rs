//! Handlers for sensor reading ingestion and history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use aquamine_core::alert::Alert;
use aquamine_core::error::CoreError;
use aquamine_core::reading::{IngestPayload, SkippedValue};
use aquamine_db::models::reading::ReadingFilter;
use aquamine_db::repositories::{ReadingRepo, SensorRepo};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of ingesting one reading.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub sensor_id: String,
    pub anomalies_detected: usize,
    /// Parameter values that were not scored, with the reason.
    pub skipped: Vec<SkippedValue>,
    /// Alert raised by this reading, if any.
    pub alert: Option<Alert>,
}

/// POST /api/v1/sensors/readings
///
/// Validate and evaluate one reading. Fails with 503 only when the reading
/// could not be stored; the sender should then retry.
pub async fn ingest_reading(
    State(state): State<AppState>,
    Json(payload): Json<IngestPayload>,
) -> AppResult<impl IntoResponse> {
    let (reading, skipped) = payload.into_reading()?;
    let sensor_id = reading.sensor_id.clone();

    if !skipped.is_empty() {
        tracing::debug!(sensor_id = %sensor_id, skipped = skipped.len(), "Skipped invalid reading values");
    }

    let outcome = state.evaluator.evaluate(reading).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: IngestResponse {
                sensor_id,
                anomalies_detected: outcome.anomalies_detected,
                skipped,
                alert: outcome.alert,
            },
        }),
    ))
}

/// GET /api/v1/sensors
pub async fn list_sensors(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let sensors = SensorRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: sensors }))
}

/// GET /api/v1/sensors/{sensor_id}/readings?start=&end=&limit=
///
/// Stored readings for one sensor, newest first.
pub async fn list_readings(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
    Query(filter): Query<ReadingFilter>,
) -> AppResult<impl IntoResponse> {
    if SensorRepo::find(&state.pool, &sensor_id).await?.is_none() {
        return Err(CoreError::UnknownSensor(sensor_id).into());
    }

    let readings = ReadingRepo::list_for_sensor(&state.pool, &sensor_id, &filter).await?;
    Ok(Json(DataResponse { data: readings }))
}
