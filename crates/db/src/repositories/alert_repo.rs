//! Repository for the `alerts` table.

use aquamine_core::alert::NewAlert;
use aquamine_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::alert::{AlertFilter, AlertRow};

/// Column list for `alerts` queries.
const COLUMNS: &str = "id, sensor_id, severity, previous_state, message, is_recovery, \
                       created_at, acknowledged_at, acknowledged_by";

pub struct AlertRepo;

impl AlertRepo {
    pub async fn insert(conn: &mut PgConnection, alert: &NewAlert) -> Result<AlertRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts (sensor_id, severity, previous_state, message, is_recovery, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(&alert.sensor_id)
            .bind(alert.severity.as_str())
            .bind(alert.previous_state.as_str())
            .bind(&alert.message)
            .bind(alert.is_recovery)
            .bind(alert.created_at)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AlertRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1");
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List alerts newest first.
    pub async fn list(pool: &PgPool, filter: &AlertFilter) -> Result<Vec<AlertRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE ($1::text IS NULL OR severity = $1) \
               AND ($2::bool IS NULL OR (acknowledged_at IS NOT NULL) = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(filter.severity.map(|s| s.as_str()))
            .bind(filter.acknowledged)
            .bind(filter.effective_limit())
            .fetch_all(pool)
            .await
    }

    /// Acknowledge an alert once.
    ///
    /// Returns `None` when the alert does not exist or was already
    /// acknowledged; callers distinguish the two with [`Self::find_by_id`].
    pub async fn acknowledge(
        pool: &PgPool,
        id: DbId,
        acknowledged_by: &str,
    ) -> Result<Option<AlertRow>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET acknowledged_at = NOW(), acknowledged_by = $2 \
             WHERE id = $1 AND acknowledged_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(id)
            .bind(acknowledged_by)
            .fetch_optional(pool)
            .await
    }

    pub async fn unacknowledged_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT COUNT(*) FROM alerts WHERE acknowledged_at IS NULL")
                .fetch_one(pool)
                .await?;
        Ok(count.unwrap_or(0))
    }
}
