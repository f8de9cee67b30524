//! Alert entity model and query DTOs.

use aquamine_core::alert::Alert;
use aquamine_core::severity::Severity;
use aquamine_core::store::StoreError;
use aquamine_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::parse_severity;

/// Default page size for alert listings.
pub const DEFAULT_ALERT_LIMIT: i64 = 50;

/// Largest page size accepted for alert listings.
pub const MAX_ALERT_LIMIT: i64 = 500;

/// A row from the `alerts` table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub id: DbId,
    pub sensor_id: String,
    pub severity: String,
    pub previous_state: String,
    pub message: String,
    pub is_recovery: bool,
    pub created_at: Timestamp,
    pub acknowledged_at: Option<Timestamp>,
    pub acknowledged_by: Option<String>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            severity: parse_severity("alerts.severity", &row.severity)?,
            previous_state: parse_severity("alerts.previous_state", &row.previous_state)?,
            id: row.id,
            sensor_id: row.sensor_id,
            message: row.message,
            is_recovery: row.is_recovery,
            created_at: row.created_at,
            acknowledged_at: row.acknowledged_at,
            acknowledged_by: row.acknowledged_by,
        })
    }
}

/// Filters for listing alerts. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    pub severity: Option<Severity>,
    pub acknowledged: Option<bool>,
    pub limit: Option<i64>,
}

impl AlertFilter {
    /// Page size clamped to `1..=MAX_ALERT_LIMIT`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_ALERT_LIMIT)
            .clamp(1, MAX_ALERT_LIMIT)
    }
}

/// Dashboard summary of current alert conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    /// Sensors currently not in the normal state.
    pub total_alerts: i64,
    pub warning_count: i64,
    pub critical_count: i64,
    pub max_severity: Severity,
    pub unacknowledged_count: i64,
}

impl AlertSummary {
    pub fn from_counts(warning_count: i64, critical_count: i64, unacknowledged_count: i64) -> Self {
        let max_severity = if critical_count > 0 {
            Severity::Critical
        } else if warning_count > 0 {
            Severity::Warning
        } else {
            Severity::Normal
        };
        Self {
            total_alerts: warning_count + critical_count,
            warning_count,
            critical_count,
            max_severity,
            unacknowledged_count,
        }
    }
}
