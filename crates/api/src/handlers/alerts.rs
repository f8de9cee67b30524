//! Handlers for alert history, acknowledgment and the sensor alert overview.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use validator::Validate;

use aquamine_core::alert::{AcknowledgeAlert, Alert};
use aquamine_core::error::CoreError;
use aquamine_core::state_machine::SensorAlertState;
use aquamine_core::types::DbId;
use aquamine_db::models::alert::{AlertFilter, AlertSummary};
use aquamine_db::repositories::{AlertRepo, SensorAlertStateRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Alert", id })
}

/// GET /api/v1/alerts?severity=&acknowledged=&limit=
///
/// Newest first.
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> AppResult<impl IntoResponse> {
    let alerts = AlertRepo::list(&state.pool, &filter)
        .await?
        .into_iter()
        .map(Alert::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(DataResponse { data: alerts }))
}

/// GET /api/v1/alerts/{id}
pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let row = AlertRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(DataResponse {
        data: Alert::try_from(row)?,
    }))
}

/// POST /api/v1/alerts/{id}/acknowledge
///
/// An alert can be acknowledged once; a second attempt is a conflict.
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AcknowledgeAlert>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let Some(row) = AlertRepo::acknowledge(&state.pool, id, &input.acknowledged_by).await? else {
        return match AlertRepo::find_by_id(&state.pool, id).await? {
            Some(_) => Err(AppError::Core(CoreError::AlreadyAcknowledged(id))),
            None => Err(not_found(id)),
        };
    };

    tracing::info!(
        alert_id = id,
        acknowledged_by = %input.acknowledged_by,
        "Alert acknowledged",
    );

    Ok(Json(DataResponse {
        data: Alert::try_from(row)?,
    }))
}

/// GET /api/v1/alerts/summary
///
/// Counts sensors currently in each elevated state, plus alerts nobody has
/// acknowledged yet.
pub async fn alert_summary(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let (warning, critical) = SensorAlertStateRepo::elevated_counts(&state.pool).await?;
    let unacknowledged = AlertRepo::unacknowledged_count(&state.pool).await?;

    Ok(Json(DataResponse {
        data: AlertSummary::from_counts(warning, critical, unacknowledged),
    }))
}

/// GET /api/v1/alerts/states
pub async fn list_states(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let states = SensorAlertStateRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(SensorAlertState::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(DataResponse { data: states }))
}
