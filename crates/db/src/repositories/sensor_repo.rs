//! Repository for the `sensors` table.

use sqlx::{PgConnection, PgPool};

use crate::models::sensor::Sensor;

/// Column list for `sensors` queries.
const COLUMNS: &str = "id, sensor_id, name, latitude, longitude, is_active, created_at, updated_at";

pub struct SensorRepo;

impl SensorRepo {
    /// Register a sensor on first contact. Known sensors are left untouched.
    pub async fn ensure_registered(conn: &mut PgConnection, sensor_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sensors (sensor_id) VALUES ($1) \
             ON CONFLICT (sensor_id) DO NOTHING",
        )
        .bind(sensor_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn find(pool: &PgPool, sensor_id: &str) -> Result<Option<Sensor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sensors WHERE sensor_id = $1");
        sqlx::query_as::<_, Sensor>(&query)
            .bind(sensor_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Sensor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sensors ORDER BY sensor_id");
        sqlx::query_as::<_, Sensor>(&query).fetch_all(pool).await
    }
}
