//! Domain errors shared by every AquaMine crate.

use crate::reading::Parameter;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A numbered record (alert, recipient) does not exist.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: DbId },

    /// No reading has ever been received from this sensor.
    #[error("Sensor '{0}' has never reported")]
    UnknownSensor(String),

    /// Rejected input at the ingestion or API boundary.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Alert {0} was already acknowledged")]
    AlreadyAcknowledged(DbId),

    /// A threshold table that cannot be scored against.
    #[error("Invalid thresholds for {parameter}: {reason}")]
    InvalidThresholds { parameter: String, reason: String },

    /// Alert policy or threshold file settings that cannot be used.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn thresholds(parameter: Parameter, reason: impl Into<String>) -> Self {
        CoreError::InvalidThresholds {
            parameter: parameter.as_str().to_string(),
            reason: reason.into(),
        }
    }
}
