use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use aquamine_core::error::CoreError;
use aquamine_core::store::StoreError;
use aquamine_pipeline::EvaluateError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Evaluation of an ingested reading failed.
    #[error(transparent)]
    Evaluate(#[from] EvaluateError),

    /// A stored row could not be mapped to a domain value.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = match &self {
            AppError::Evaluate(e) => e.is_retryable(),
            _ => false,
        };

        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { .. } | CoreError::UnknownSensor(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", core.to_string())
                }
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::AlreadyAcknowledged(_) => {
                    (StatusCode::CONFLICT, "CONFLICT", core.to_string())
                }
                CoreError::InvalidThresholds { .. } | CoreError::Config(_) => {
                    internal(&core.to_string())
                }
                CoreError::Internal(msg) => internal(msg),
            },

            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }

            AppError::Evaluate(err) if retryable => {
                tracing::warn!(error = %err, "Reading evaluation failed, caller may retry");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORAGE_UNAVAILABLE",
                    "Reading could not be stored, retry later".to_string(),
                )
            }
            AppError::Evaluate(err) => internal(&err.to_string()),
            AppError::Store(err) => internal(&err.to_string()),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if retryable {
            body["retryable"] = json!(true);
        }

        (status, axum::Json(body)).into_response()
    }
}

fn internal(msg: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
