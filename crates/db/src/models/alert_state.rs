//! Per-sensor alert state model.

use aquamine_core::state_machine::SensorAlertState;
use aquamine_core::store::StoreError;
use aquamine_core::types::Timestamp;
use sqlx::FromRow;

use super::parse_severity;

/// A row from the `sensor_alert_states` table.
#[derive(Debug, Clone, FromRow)]
pub struct SensorAlertStateRow {
    pub sensor_id: String,
    pub current_state: String,
    pub last_alert_at: Option<Timestamp>,
    pub last_notification_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl TryFrom<SensorAlertStateRow> for SensorAlertState {
    type Error = StoreError;

    fn try_from(row: SensorAlertStateRow) -> Result<Self, Self::Error> {
        Ok(SensorAlertState {
            current_state: parse_severity("sensor_alert_states.current_state", &row.current_state)?,
            sensor_id: row.sensor_id,
            last_alert_at: row.last_alert_at,
            last_notification_at: row.last_notification_at,
        })
    }
}
