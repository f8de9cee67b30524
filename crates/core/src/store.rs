//! Storage collaborator traits.
//!
//! The evaluation pipeline talks to persistence only through these traits.
//! One [`AlertTransaction`] spans everything a single evaluation writes, and
//! holding it serializes evaluations of the same sensor. Nothing is visible
//! to other transactions until [`AlertTransaction::commit`] succeeds; dropping
//! an uncommitted transaction discards its writes.

mod memory;

pub use memory::{MemoryAlertStore, MemoryTransaction};

use async_trait::async_trait;

use crate::alert::{Alert, NewAlert, NotificationRecipient};
use crate::reading::Reading;
use crate::scoring::AnomalyResult;
use crate::severity::Severity;
use crate::state_machine::SensorAlertState;

/// Persistence failure during an evaluation cycle.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the write. Retrying the
    /// whole evaluation is safe.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back to a domain value.
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Read access to notification recipients.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Active recipients opted in to alerts of `severity`. Recoveries
    /// (`normal`) return every active recipient.
    async fn active_recipients(
        &self,
        severity: Severity,
    ) -> Result<Vec<NotificationRecipient>, StoreError>;
}

/// Transactional alert storage.
#[async_trait]
pub trait AlertStore: RecipientDirectory {
    type Txn: AlertTransaction;

    /// Open a transaction for `sensor_id`, waiting for any other open
    /// transaction on the same sensor to finish first.
    async fn begin(&self, sensor_id: &str) -> Result<Self::Txn, StoreError>;
}

/// Writes of one evaluation cycle for one sensor.
#[async_trait]
pub trait AlertTransaction: Send {
    /// The sensor's state record, or the initial `normal` state if none exists.
    async fn current_state(&mut self) -> Result<SensorAlertState, StoreError>;

    async fn record_reading(&mut self, reading: &Reading) -> Result<(), StoreError>;

    /// Audit trail of non-normal per-parameter results.
    async fn insert_anomalies(&mut self, anomalies: &[AnomalyResult]) -> Result<(), StoreError>;

    async fn insert_alert(&mut self, alert: &NewAlert) -> Result<Alert, StoreError>;

    async fn save_state(&mut self, state: &SensorAlertState) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
