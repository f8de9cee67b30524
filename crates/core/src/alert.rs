//! Alert records, notification recipients and the live alert event payload.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::scoring::AnomalyResult;
use crate::severity::Severity;
use crate::state_machine::Transition;
use crate::types::{DbId, SensorId, Timestamp};

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// An immutable record of one alerting transition.
///
/// Acknowledgment is the only later mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: DbId,
    pub sensor_id: SensorId,
    /// The state the sensor moved into.
    pub severity: Severity,
    pub previous_state: Severity,
    pub message: String,
    pub is_recovery: bool,
    pub created_at: Timestamp,
    pub acknowledged_at: Option<Timestamp>,
    pub acknowledged_by: Option<String>,
}

impl Alert {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }
}

/// Insert payload for an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub sensor_id: SensorId,
    pub severity: Severity,
    pub previous_state: Severity,
    pub message: String,
    pub is_recovery: bool,
    pub created_at: Timestamp,
}

impl NewAlert {
    pub fn from_transition(
        sensor_id: impl Into<SensorId>,
        transition: &Transition,
        message: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            severity: transition.new_state,
            previous_state: transition.previous_state,
            message,
            is_recovery: transition.is_recovery,
            created_at,
        }
    }
}

/// Request body for acknowledging an alert.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AcknowledgeAlert {
    #[validate(length(min = 1, max = 100))]
    pub acknowledged_by: String,
}

// ---------------------------------------------------------------------------
// Live event payload
// ---------------------------------------------------------------------------

/// Alert as pushed to live dashboards and handed to the notification queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(flatten)]
    pub alert: Alert,
    pub is_escalation: bool,
    /// Highest contributing score, absent for recoveries.
    pub max_score: Option<f64>,
    pub anomalies: Vec<AnomalyResult>,
}

// ---------------------------------------------------------------------------
// Recipients
// ---------------------------------------------------------------------------

/// Someone who receives alert notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecipient {
    pub id: DbId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub notify_warning: bool,
    pub notify_critical: bool,
}

impl NotificationRecipient {
    /// Whether this recipient should be told about an alert of `severity`.
    ///
    /// Recoveries (`normal`) reach every active recipient.
    pub fn wants(&self, severity: Severity) -> bool {
        self.is_active
            && match severity {
                Severity::Normal => true,
                Severity::Warning => self.notify_warning,
                Severity::Critical => self.notify_critical,
            }
    }
}

fn default_true() -> bool {
    true
}

/// Create payload for a recipient.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRecipient {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 8, max = 20))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default = "default_true")]
    pub notify_warning: bool,
    #[serde(default = "default_true")]
    pub notify_critical: bool,
}

impl CreateRecipient {
    /// A recipient without any contact channel can never be reached.
    pub fn has_contact(&self) -> bool {
        self.phone.is_some() || self.email.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
