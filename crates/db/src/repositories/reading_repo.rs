//! Repository for the `sensor_readings` table.

use aquamine_core::reading::{Parameter, Reading};
use sqlx::{PgConnection, PgPool};

use crate::models::reading::{ReadingFilter, ReadingRow};

/// Column list for `sensor_readings` queries.
const COLUMNS: &str = "id, sensor_id, recorded_at, ph, turbidity, conductivity, temperature, \
                       battery_voltage, signal_strength";

pub struct ReadingRepo;

impl ReadingRepo {
    pub async fn insert(conn: &mut PgConnection, reading: &Reading) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sensor_readings \
                (sensor_id, recorded_at, ph, turbidity, conductivity, temperature, \
                 battery_voltage, signal_strength) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&reading.sensor_id)
        .bind(reading.timestamp)
        .bind(reading.value(Parameter::Ph))
        .bind(reading.value(Parameter::Turbidity))
        .bind(reading.value(Parameter::Conductivity))
        .bind(reading.value(Parameter::Temperature))
        .bind(reading.battery_voltage)
        .bind(reading.signal_strength)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Reading history for one sensor, newest first.
    pub async fn list_for_sensor(
        pool: &PgPool,
        sensor_id: &str,
        filter: &ReadingFilter,
    ) -> Result<Vec<ReadingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensor_readings \
             WHERE sensor_id = $1 \
               AND ($2::timestamptz IS NULL OR recorded_at >= $2) \
               AND ($3::timestamptz IS NULL OR recorded_at <= $3) \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT $4"
        );
        sqlx::query_as::<_, ReadingRow>(&query)
            .bind(sensor_id)
            .bind(filter.start)
            .bind(filter.end)
            .bind(filter.effective_limit())
            .fetch_all(pool)
            .await
    }
}
