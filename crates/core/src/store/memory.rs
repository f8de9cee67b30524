//! In-process [`AlertStore`] used by tests and single-node demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{AlertStore, AlertTransaction, RecipientDirectory, StoreError};
use crate::alert::{Alert, NewAlert, NotificationRecipient};
use crate::reading::Reading;
use crate::scoring::AnomalyResult;
use crate::severity::Severity;
use crate::state_machine::SensorAlertState;
use crate::types::SensorId;

#[derive(Debug, Default)]
struct Tables {
    states: HashMap<SensorId, SensorAlertState>,
    readings: Vec<Reading>,
    anomalies: Vec<AnomalyResult>,
    alerts: Vec<Alert>,
    recipients: Vec<NotificationRecipient>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    sensor_locks: Mutex<HashMap<SensorId, Arc<Mutex<()>>>>,
    next_alert_id: AtomicI64,
    fail_commits: AtomicBool,
}

/// In-memory store with per-sensor serialization.
///
/// A transaction holds its sensor's lock from `begin` until it is committed
/// or dropped. Writes are staged on the transaction and applied atomically on
/// commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryAlertStore {
    shared: Arc<Shared>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail with [`StoreError::Unavailable`].
    pub fn set_fail_commits(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub async fn add_recipient(&self, recipient: NotificationRecipient) {
        self.shared.tables.lock().await.recipients.push(recipient);
    }

    pub async fn state(&self, sensor_id: &str) -> Option<SensorAlertState> {
        self.shared.tables.lock().await.states.get(sensor_id).cloned()
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.shared.tables.lock().await.alerts.clone()
    }

    pub async fn anomalies(&self) -> Vec<AnomalyResult> {
        self.shared.tables.lock().await.anomalies.clone()
    }

    pub async fn readings(&self) -> Vec<Reading> {
        self.shared.tables.lock().await.readings.clone()
    }

    /// The lock for `sensor_id`. Locks referenced only by the map have no
    /// holder and no waiter, so they are pruned here.
    async fn sensor_lock(&self, sensor_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.shared.sensor_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(sensor_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl RecipientDirectory for MemoryAlertStore {
    async fn active_recipients(
        &self,
        severity: Severity,
    ) -> Result<Vec<NotificationRecipient>, StoreError> {
        let tables = self.shared.tables.lock().await;
        Ok(tables
            .recipients
            .iter()
            .filter(|r| r.wants(severity))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    type Txn = MemoryTransaction;

    async fn begin(&self, sensor_id: &str) -> Result<Self::Txn, StoreError> {
        let guard = self.sensor_lock(sensor_id).await.lock_owned().await;
        Ok(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            sensor_id: sensor_id.to_string(),
            _guard: guard,
            readings: Vec::new(),
            anomalies: Vec::new(),
            alerts: Vec::new(),
            state: None,
        })
    }
}

/// Staged writes for one sensor.
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    sensor_id: SensorId,
    _guard: OwnedMutexGuard<()>,
    readings: Vec<Reading>,
    anomalies: Vec<AnomalyResult>,
    alerts: Vec<Alert>,
    state: Option<SensorAlertState>,
}

#[async_trait]
impl AlertTransaction for MemoryTransaction {
    async fn current_state(&mut self) -> Result<SensorAlertState, StoreError> {
        if let Some(state) = &self.state {
            return Ok(state.clone());
        }
        let tables = self.shared.tables.lock().await;
        Ok(tables
            .states
            .get(&self.sensor_id)
            .cloned()
            .unwrap_or_else(|| SensorAlertState::initial(self.sensor_id.clone())))
    }

    async fn record_reading(&mut self, reading: &Reading) -> Result<(), StoreError> {
        self.readings.push(reading.clone());
        Ok(())
    }

    async fn insert_anomalies(&mut self, anomalies: &[AnomalyResult]) -> Result<(), StoreError> {
        self.anomalies.extend_from_slice(anomalies);
        Ok(())
    }

    async fn insert_alert(&mut self, alert: &NewAlert) -> Result<Alert, StoreError> {
        let id = self.shared.next_alert_id.fetch_add(1, Ordering::SeqCst) + 1;
        let alert = Alert {
            id,
            sensor_id: alert.sensor_id.clone(),
            severity: alert.severity,
            previous_state: alert.previous_state,
            message: alert.message.clone(),
            is_recovery: alert.is_recovery,
            created_at: alert.created_at,
            acknowledged_at: None,
            acknowledged_by: None,
        };
        self.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn save_state(&mut self, state: &SensorAlertState) -> Result<(), StoreError> {
        if state.sensor_id != self.sensor_id {
            return Err(StoreError::Corrupt(format!(
                "transaction for {} cannot write state of {}",
                self.sensor_id, state.sensor_id
            )));
        }
        self.state = Some(state.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.shared.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit rejected".to_string()));
        }
        let mut tables = self.shared.tables.lock().await;
        tables.readings.extend(self.readings);
        tables.anomalies.extend(self.anomalies);
        tables.alerts.extend(self.alerts);
        if let Some(state) = self.state {
            tables.states.insert(self.sensor_id, state);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
