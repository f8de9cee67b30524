//! Handlers for notification recipients.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use validator::Validate;

use aquamine_core::alert::{CreateRecipient, NotificationRecipient};
use aquamine_core::error::CoreError;
use aquamine_core::types::DbId;
use aquamine_db::repositories::RecipientRepo;

use crate::error::{AppError, AppResult};
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/recipients?include_inactive=
pub async fn list_recipients(
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<impl IntoResponse> {
    let recipients: Vec<NotificationRecipient> =
        RecipientRepo::list(&state.pool, params.include_inactive)
            .await?
            .into_iter()
            .map(NotificationRecipient::from)
            .collect();

    Ok(Json(DataResponse { data: recipients }))
}

/// POST /api/v1/recipients
///
/// A recipient needs at least one contact address.
pub async fn create_recipient(
    State(state): State<AppState>,
    Json(input): Json<CreateRecipient>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if !input.has_contact() {
        return Err(AppError::Core(CoreError::Validation(
            "A recipient needs a phone number or an email address".to_string(),
        )));
    }

    let recipient = NotificationRecipient::from(RecipientRepo::create(&state.pool, &input).await?);

    tracing::info!(
        recipient_id = recipient.id,
        name = %recipient.name,
        "Notification recipient created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: recipient })))
}

/// DELETE /api/v1/recipients/{id}
///
/// Soft delete: the recipient is deactivated and stops receiving alerts.
pub async fn deactivate_recipient(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !RecipientRepo::deactivate(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "NotificationRecipient",
            id,
        }));
    }

    tracing::info!(recipient_id = id, "Notification recipient deactivated");
    Ok(StatusCode::NO_CONTENT)
}
