//! [`AlertStore`] backed by PostgreSQL.
//!
//! Each evaluation runs in one database transaction. `begin` registers the
//! sensor if needed and takes a row lock on its `sensor_alert_states` row, so
//! concurrent evaluations of the same sensor queue behind each other while
//! other sensors proceed. Dropping the transaction without committing rolls
//! everything back and releases the lock.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use aquamine_core::alert::{Alert, NewAlert, NotificationRecipient};
use aquamine_core::reading::Reading;
use aquamine_core::scoring::AnomalyResult;
use aquamine_core::severity::Severity;
use aquamine_core::state_machine::SensorAlertState;
use aquamine_core::store::{AlertStore, AlertTransaction, RecipientDirectory, StoreError};

use crate::repositories::{
    AlertRepo, AnomalyRepo, ReadingRepo, RecipientRepo, SensorAlertStateRepo, SensorRepo,
};

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[derive(Debug, Clone)]
pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecipientDirectory for PgAlertStore {
    async fn active_recipients(
        &self,
        severity: Severity,
    ) -> Result<Vec<NotificationRecipient>, StoreError> {
        let rows = RecipientRepo::active_for(&self.pool, severity)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(NotificationRecipient::from).collect())
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    type Txn = PgAlertTransaction;

    async fn begin(&self, sensor_id: &str) -> Result<Self::Txn, StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        SensorRepo::ensure_registered(&mut *tx, sensor_id)
            .await
            .map_err(unavailable)?;
        let row = SensorAlertStateRepo::lock(&mut *tx, sensor_id)
            .await
            .map_err(unavailable)?;
        let state = SensorAlertState::try_from(row)?;

        tracing::trace!(sensor_id, "Locked sensor alert state");
        Ok(PgAlertTransaction { tx, state })
    }
}

/// An open evaluation transaction holding the sensor's row lock.
pub struct PgAlertTransaction {
    tx: Transaction<'static, Postgres>,
    state: SensorAlertState,
}

#[async_trait]
impl AlertTransaction for PgAlertTransaction {
    async fn current_state(&mut self) -> Result<SensorAlertState, StoreError> {
        Ok(self.state.clone())
    }

    async fn record_reading(&mut self, reading: &Reading) -> Result<(), StoreError> {
        ReadingRepo::insert(&mut *self.tx, reading)
            .await
            .map_err(unavailable)
    }

    async fn insert_anomalies(&mut self, anomalies: &[AnomalyResult]) -> Result<(), StoreError> {
        AnomalyRepo::insert_many(&mut *self.tx, anomalies)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn insert_alert(&mut self, alert: &NewAlert) -> Result<Alert, StoreError> {
        let row = AlertRepo::insert(&mut *self.tx, alert)
            .await
            .map_err(unavailable)?;
        Alert::try_from(row)
    }

    async fn save_state(&mut self, state: &SensorAlertState) -> Result<(), StoreError> {
        if state.sensor_id != self.state.sensor_id {
            return Err(StoreError::Corrupt(format!(
                "transaction for {} cannot write state of {}",
                self.state.sensor_id, state.sensor_id
            )));
        }
        SensorAlertStateRepo::save(&mut *self.tx, state)
            .await
            .map_err(unavailable)?;
        self.state = state.clone();
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(unavailable)
    }
}
