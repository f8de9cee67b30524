//! The evaluation cycle for one reading.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use aquamine_core::aggregation::aggregate;
use aquamine_core::alert::{Alert, AlertEvent, NewAlert};
use aquamine_core::message;
use aquamine_core::reading::Reading;
use aquamine_core::scoring::{AnomalyResult, ThresholdTable};
use aquamine_core::state_machine::{process, AlertPolicy, Transition};
use aquamine_core::store::{AlertStore, AlertTransaction};
use aquamine_core::types::Timestamp;
use aquamine_events::{EventPublisher, NotificationQueue};

use crate::error::EvaluateError;

/// What one evaluation decided.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    /// Parameters scored above `normal`.
    pub anomalies_detected: usize,
    /// `None` when the reading carried nothing that could be scored.
    pub transition: Option<Transition>,
    /// The alert recorded by this cycle, if any.
    pub alert: Option<Alert>,
}

/// Runs readings through scoring, aggregation and the alert state machine.
///
/// The decision and every write it implies are committed in one store
/// transaction. Live events and notifications only go out after that commit,
/// so a failed cycle leaves no trace anywhere and may simply be retried.
pub struct Evaluator<S: AlertStore> {
    store: Arc<S>,
    thresholds: Arc<ThresholdTable>,
    policy: AlertPolicy,
    publisher: EventPublisher,
    notifications: Option<NotificationQueue>,
}

impl<S: AlertStore> Evaluator<S> {
    /// An evaluator with the default threshold table and alert policy that
    /// publishes live events but does not notify anyone.
    pub fn new(store: Arc<S>, publisher: EventPublisher) -> Self {
        Self {
            store,
            thresholds: Arc::new(ThresholdTable::default()),
            policy: AlertPolicy::default(),
            publisher,
            notifications: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdTable) -> Self {
        self.thresholds = Arc::new(thresholds);
        self
    }

    pub fn with_policy(mut self, policy: AlertPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_notifications(mut self, queue: NotificationQueue) -> Self {
        self.notifications = Some(queue);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Evaluate `reading` against the sensor's current alert state.
    pub async fn evaluate(&self, reading: Reading) -> Result<EvaluationOutcome, EvaluateError> {
        self.evaluate_at(reading, Utc::now()).await
    }

    /// Like [`evaluate`](Self::evaluate) with an explicit decision time.
    ///
    /// Cooldowns are measured against `now`, not against the reading's own
    /// timestamp, so late or replayed readings cannot reopen a cooldown.
    pub async fn evaluate_at(
        &self,
        reading: Reading,
        now: Timestamp,
    ) -> Result<EvaluationOutcome, EvaluateError> {
        let sensor_id = reading.sensor_id.clone();
        let scored = self.thresholds.score_reading(&reading);
        let anomalies: Vec<AnomalyResult> =
            scored.iter().filter(|a| a.is_anomaly()).cloned().collect();
        let aggregated = aggregate(anomalies.iter().cloned()).remove(&sensor_id);

        let mut txn = self.store.begin(&sensor_id).await?;
        txn.record_reading(&reading).await?;
        if !anomalies.is_empty() {
            txn.insert_anomalies(&anomalies).await?;
        }

        // A reading with no usable values says nothing about the sensor. A value
        // of a parameter without thresholds does count: it scores normal.
        if scored.is_empty() {
            txn.commit().await?;
            tracing::debug!(sensor_id = %sensor_id, "Reading had no scorable values");
            self.publisher.publish_reading(&reading).await;
            return Ok(EvaluationOutcome {
                anomalies_detected: 0,
                transition: None,
                alert: None,
            });
        }

        let state = txn.current_state().await?;
        let transition = process(
            &state,
            aggregated.as_ref().map(|a| a.severity),
            now,
            &self.policy,
        );

        let alert = if transition.should_alert {
            let text = message::build(
                &sensor_id,
                transition.previous_state,
                transition.new_state,
                &anomalies,
            )
            .text;
            let new_alert = NewAlert::from_transition(sensor_id.clone(), &transition, text, now);
            Some(txn.insert_alert(&new_alert).await?)
        } else {
            None
        };

        let next = state.apply(&transition, now);
        if next != state {
            txn.save_state(&next).await?;
        }
        txn.commit().await?;

        tracing::debug!(
            sensor_id = %sensor_id,
            anomalies = anomalies.len(),
            previous_state = %transition.previous_state,
            new_state = %transition.new_state,
            should_alert = transition.should_alert,
            should_notify = transition.should_notify,
            "Reading evaluated"
        );

        self.publisher.publish_reading(&reading).await;

        if let Some(alert) = &alert {
            let event = AlertEvent {
                alert: alert.clone(),
                is_escalation: transition.is_escalation,
                max_score: aggregated.as_ref().map(|a| a.max_score),
                anomalies: aggregated.map(|a| a.anomalies).unwrap_or_default(),
            };
            self.announce(event, transition.should_notify).await;
        }

        Ok(EvaluationOutcome {
            anomalies_detected: anomalies.len(),
            transition: Some(transition),
            alert,
        })
    }

    async fn announce(&self, event: AlertEvent, notify: bool) {
        let alert = &event.alert;
        tracing::info!(
            alert_id = alert.id,
            sensor_id = %alert.sensor_id,
            severity = %alert.severity,
            previous_state = %alert.previous_state,
            is_recovery = alert.is_recovery,
            notify,
            "Alert raised"
        );

        self.publisher.publish_alert(&event).await;

        if !notify {
            return;
        }
        let Some(queue) = &self.notifications else {
            return;
        };
        let alert_id = alert.id;
        if let Err(e) = queue.enqueue(event).await {
            tracing::error!(alert_id, error = %e, "Failed to queue alert notification");
        }
    }
}
