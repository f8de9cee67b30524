//! Repository for the `sensor_alert_states` table.

use aquamine_core::state_machine::SensorAlertState;
use sqlx::{PgConnection, PgPool};

use crate::models::alert_state::SensorAlertStateRow;

/// Column list for `sensor_alert_states` queries.
const COLUMNS: &str = "sensor_id, current_state, last_alert_at, last_notification_at, updated_at";

pub struct SensorAlertStateRepo;

impl SensorAlertStateRepo {
    /// Lock the sensor's state row for the rest of the transaction, creating
    /// it in the `normal` state first if needed.
    ///
    /// The sensor must already be registered.
    pub async fn lock(
        conn: &mut PgConnection,
        sensor_id: &str,
    ) -> Result<SensorAlertStateRow, sqlx::Error> {
        sqlx::query(
            "INSERT INTO sensor_alert_states (sensor_id) VALUES ($1) \
             ON CONFLICT (sensor_id) DO NOTHING",
        )
        .bind(sensor_id)
        .execute(&mut *conn)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM sensor_alert_states WHERE sensor_id = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, SensorAlertStateRow>(&query)
            .bind(sensor_id)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn save(conn: &mut PgConnection, state: &SensorAlertState) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE sensor_alert_states \
             SET current_state = $2, last_alert_at = $3, last_notification_at = $4, \
                 updated_at = NOW() \
             WHERE sensor_id = $1",
        )
        .bind(&state.sensor_id)
        .bind(state.current_state.as_str())
        .bind(state.last_alert_at)
        .bind(state.last_notification_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<SensorAlertStateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sensor_alert_states ORDER BY sensor_id");
        sqlx::query_as::<_, SensorAlertStateRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// `(warning_count, critical_count)` across all sensors.
    pub async fn elevated_counts(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as(
            "SELECT \
                COUNT(*) FILTER (WHERE current_state = 'warning'), \
                COUNT(*) FILTER (WHERE current_state = 'critical') \
             FROM sensor_alert_states",
        )
        .fetch_one(pool)
        .await
    }
}
