//! Notification recipient model.

use aquamine_core::alert::NotificationRecipient;
use aquamine_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `notification_recipients` table.
#[derive(Debug, Clone, FromRow)]
pub struct RecipientRow {
    pub id: DbId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub notify_warning: bool,
    pub notify_critical: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<RecipientRow> for NotificationRecipient {
    fn from(row: RecipientRow) -> Self {
        NotificationRecipient {
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            is_active: row.is_active,
            notify_warning: row.notify_warning,
            notify_critical: row.notify_critical,
        }
    }
}
