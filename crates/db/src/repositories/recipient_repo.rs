//! Repository for the `notification_recipients` table.

use aquamine_core::alert::CreateRecipient;
use aquamine_core::severity::Severity;
use aquamine_core::types::DbId;
use sqlx::PgPool;

use crate::models::recipient::RecipientRow;

/// Column list for `notification_recipients` queries.
const COLUMNS: &str = "id, name, phone, email, is_active, notify_warning, notify_critical, \
                       created_at, updated_at";

pub struct RecipientRepo;

impl RecipientRepo {
    pub async fn create(pool: &PgPool, input: &CreateRecipient) -> Result<RecipientRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_recipients \
                (name, phone, email, notify_warning, notify_critical) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RecipientRow>(&query)
            .bind(&input.name)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(input.notify_warning)
            .bind(input.notify_critical)
            .fetch_one(pool)
            .await
    }

    /// List recipients, optionally including deactivated ones.
    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<RecipientRow>, sqlx::Error> {
        let filter = if include_inactive { "" } else { "WHERE is_active = true" };
        let query = format!("SELECT {COLUMNS} FROM notification_recipients {filter} ORDER BY id");
        sqlx::query_as::<_, RecipientRow>(&query).fetch_all(pool).await
    }

    /// Active recipients opted in to `severity`; every active recipient for
    /// recoveries.
    pub async fn active_for(pool: &PgPool, severity: Severity) -> Result<Vec<RecipientRow>, sqlx::Error> {
        let filter = match severity {
            Severity::Normal => "",
            Severity::Warning => "AND notify_warning = true",
            Severity::Critical => "AND notify_critical = true",
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notification_recipients \
             WHERE is_active = true {filter} ORDER BY id"
        );
        sqlx::query_as::<_, RecipientRow>(&query).fetch_all(pool).await
    }

    /// Soft-delete a recipient. Returns `false` if it was not found or
    /// already inactive.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_recipients SET is_active = false, updated_at = NOW() \
             WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
