//! End-to-end evaluation scenarios against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use aquamine_core::alert::{AlertEvent, NotificationRecipient};
use aquamine_core::channels::CHANNEL_ALERTS;
use aquamine_core::message::AlertMessage;
use aquamine_core::reading::{Parameter, Reading};
use aquamine_core::severity::Severity;
use aquamine_core::state_machine::{AlertPolicy, CooldownPolicy};
use aquamine_core::store::{MemoryAlertStore, RecipientDirectory, StoreError};
use aquamine_core::types::Timestamp;
use aquamine_events::delivery::{ChannelKind, DeliveryError, NotificationChannel};
use aquamine_events::pubsub::MessageStream;
use aquamine_events::{
    EventPublisher, LocalPubSub, NotificationDispatcher, NotificationQueue, PubSubTransport,
    QueueConfig, QueueWorker,
};
use aquamine_pipeline::{EvaluateError, Evaluator};
use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SENSOR: &str = "AMD-01";

/// Records `(address, subject)` for every delivery.
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WhatsApp
    }

    async fn send(&self, address: &str, message: &AlertMessage) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .await
            .push((address.to_string(), message.subject.clone()));
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryAlertStore>,
    bus: Arc<LocalPubSub>,
    evaluator: Evaluator<MemoryAlertStore>,
    channel: Arc<RecordingChannel>,
    worker: QueueWorker,
}

impl Harness {
    async fn new(policy: AlertPolicy) -> Self {
        let store = Arc::new(MemoryAlertStore::new());
        store
            .add_recipient(NotificationRecipient {
                id: 1,
                name: "Site supervisor".to_string(),
                phone: Some("+6281200000001".to_string()),
                email: None,
                is_active: true,
                notify_warning: true,
                notify_critical: true,
            })
            .await;

        let bus = Arc::new(LocalPubSub::default());
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            vec![channel.clone() as Arc<dyn NotificationChannel>],
            Duration::from_secs(5),
        ));
        let directory: Arc<dyn RecipientDirectory> = store.clone();
        let (queue, worker) = NotificationQueue::new(QueueConfig::default(), directory, dispatcher);

        let transport: Arc<dyn PubSubTransport> = bus.clone();
        let evaluator = Evaluator::new(store.clone(), EventPublisher::new(transport))
            .with_policy(policy)
            .with_notifications(queue);

        Self {
            store,
            bus,
            evaluator,
            channel,
            worker,
        }
    }

    async fn alert_stream(&self) -> MessageStream {
        self.bus.subscribe(&[CHANNEL_ALERTS]).await.unwrap()
    }

    /// Drop the evaluator (closing the queue) and wait for every queued
    /// notification to be delivered.
    async fn drain(self) -> Vec<(String, String)> {
        let Harness {
            evaluator,
            channel,
            worker,
            ..
        } = self;
        drop(evaluator);
        worker.run(CancellationToken::new()).await;
        let sent = channel.sent.lock().await.clone();
        sent
    }
}

fn ph(value: f64, at: Timestamp) -> Reading {
    Reading::new(SENSOR, at).with_value(Parameter::Ph, value)
}

async fn next_alert(stream: &mut MessageStream) -> Option<AlertEvent> {
    let msg = tokio::time::timeout(Duration::from_millis(200), stream.next())
        .await
        .ok()
        .flatten()?;
    Some(serde_json::from_str(&msg.payload).unwrap())
}

// ---------------------------------------------------------------------------
// Test: scenarios A to E in sequence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn normal_warning_critical_recovery_sequence() {
    let h = Harness::new(AlertPolicy::default()).await;
    let mut alerts = h.alert_stream().await;
    let t0 = Utc::now();
    let secs = chrono::Duration::seconds;

    // A: normal reading, nothing happens.
    let a = h.evaluator.evaluate_at(ph(7.0, t0), t0).await.unwrap();
    assert_eq!(a.anomalies_detected, 0);
    assert!(a.alert.is_none());
    assert!(!a.transition.unwrap().should_alert);

    // B: first warning alerts and notifies.
    let b = h.evaluator.evaluate_at(ph(5.0, t0 + secs(10)), t0 + secs(10)).await.unwrap();
    assert_eq!(b.anomalies_detected, 1);
    let alert_b = b.alert.unwrap();
    assert_eq!(alert_b.previous_state, Severity::Normal);
    assert_eq!(alert_b.severity, Severity::Warning);
    assert!(b.transition.unwrap().should_notify);

    // C: still warning within the cooldown, suppressed.
    let c = h.evaluator.evaluate_at(ph(5.1, t0 + secs(40)), t0 + secs(40)).await.unwrap();
    assert_eq!(c.anomalies_detected, 1);
    assert!(c.alert.is_none());
    assert!(!c.transition.unwrap().should_notify);

    // D: critical bypasses the cooldown.
    let d = h.evaluator.evaluate_at(ph(4.0, t0 + secs(50)), t0 + secs(50)).await.unwrap();
    let alert_d = d.alert.unwrap();
    assert_eq!(alert_d.previous_state, Severity::Warning);
    assert_eq!(alert_d.severity, Severity::Critical);
    let t_d = d.transition.unwrap();
    assert!(t_d.should_notify);
    assert!(!t_d.is_escalation);

    // E: recovery is recorded; still inside the cooldown so nobody is paged.
    let e = h.evaluator.evaluate_at(ph(7.0, t0 + secs(60)), t0 + secs(60)).await.unwrap();
    assert_eq!(e.anomalies_detected, 0);
    let alert_e = e.alert.unwrap();
    assert!(alert_e.is_recovery);
    assert_eq!(alert_e.previous_state, Severity::Critical);
    assert_eq!(alert_e.severity, Severity::Normal);
    assert!(!e.transition.unwrap().should_notify);

    let stored = h.store.alerts().await;
    assert_eq!(stored.len(), 3);
    assert_eq!(h.store.readings().await.len(), 5);
    assert_eq!(h.store.anomalies().await.len(), 3);
    let state = h.store.state(SENSOR).await.unwrap();
    assert_eq!(state.current_state, Severity::Normal);
    assert_eq!(state.last_notification_at, Some(t0 + secs(50)));

    // One live event per recorded alert, in order.
    let published: Vec<Severity> = [
        next_alert(&mut alerts).await.unwrap(),
        next_alert(&mut alerts).await.unwrap(),
        next_alert(&mut alerts).await.unwrap(),
    ]
    .iter()
    .map(|ev| ev.alert.severity)
    .collect();
    assert_eq!(
        published,
        vec![Severity::Warning, Severity::Critical, Severity::Normal]
    );
    assert!(next_alert(&mut alerts).await.is_none());

    // Queued jobs run concurrently, so delivery order is not fixed.
    let mut subjects: Vec<String> = h.drain().await.into_iter().map(|(_, s)| s).collect();
    subjects.sort();
    assert_eq!(
        subjects,
        vec![
            "[AquaMine] CRITICAL Alert - AMD-01".to_string(),
            "[AquaMine] WARNING Alert - AMD-01".to_string(),
        ]
    );
}

// ---------------------------------------------------------------------------
// Test: direct escalation carries the aggregated context
// ---------------------------------------------------------------------------

#[tokio::test]
async fn escalation_aggregates_all_parameters() {
    let h = Harness::new(AlertPolicy::default()).await;
    let mut alerts = h.alert_stream().await;
    let now = Utc::now();

    let reading = Reading::new(SENSOR, now)
        .with_value(Parameter::Ph, 6.0)
        .with_value(Parameter::Conductivity, 1500.0)
        .with_value(Parameter::Temperature, 28.0);
    let outcome = h.evaluator.evaluate_at(reading, now).await.unwrap();

    assert_eq!(outcome.anomalies_detected, 2);
    assert_eq!(outcome.alert.unwrap().severity, Severity::Critical);
    assert!(outcome.transition.unwrap().is_escalation);

    let event = next_alert(&mut alerts).await.unwrap();
    assert!(event.is_escalation);
    assert_eq!(event.anomalies.len(), 2);
    assert!(event.max_score.unwrap() >= 7.0);

    assert_eq!(h.drain().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Test: a reading with nothing scorable leaves the state untouched
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_reading_is_recorded_without_decision() {
    let h = Harness::new(AlertPolicy::default()).await;
    let now = Utc::now();

    h.evaluator.evaluate_at(ph(5.0, now), now).await.unwrap();
    let outcome = h
        .evaluator
        .evaluate_at(Reading::new(SENSOR, now), now)
        .await
        .unwrap();

    assert!(outcome.transition.is_none());
    assert!(outcome.alert.is_none());
    assert_eq!(h.store.readings().await.len(), 2);
    assert_eq!(
        h.store.state(SENSOR).await.unwrap().current_state,
        Severity::Warning
    );
}

// ---------------------------------------------------------------------------
// Test: a value without thresholds is a normal observation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unmonitored_value_counts_as_normal_observation() {
    let h = Harness::new(AlertPolicy::default()).await;
    let now = Utc::now();

    h.evaluator.evaluate_at(ph(4.0, now), now).await.unwrap();

    let later = now + chrono::Duration::seconds(10);
    let temperature_only = Reading::new(SENSOR, later).with_value(Parameter::Temperature, 24.0);
    let outcome = h.evaluator.evaluate_at(temperature_only, later).await.unwrap();

    assert_eq!(outcome.anomalies_detected, 0);
    let transition = outcome.transition.unwrap();
    assert!(transition.is_recovery);
    assert_eq!(transition.previous_state, Severity::Critical);
    let alert = outcome.alert.unwrap();
    assert!(alert.is_recovery);
    assert_eq!(
        h.store.state(SENSOR).await.unwrap().current_state,
        Severity::Normal
    );

    // The recovery falls inside the cooldown, so only the critical alert notifies.
    assert_eq!(h.drain().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Test: persistence failure is retryable and leaves no trace
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_commit_changes_nothing() {
    let h = Harness::new(AlertPolicy::default()).await;
    let mut alerts = h.alert_stream().await;
    let now = Utc::now();

    h.store.set_fail_commits(true);
    let err = h.evaluator.evaluate_at(ph(4.0, now), now).await.unwrap_err();
    assert!(err.is_retryable());
    assert_matches!(err, EvaluateError::Store(StoreError::Unavailable(_)));

    assert!(h.store.alerts().await.is_empty());
    assert!(h.store.readings().await.is_empty());
    assert_eq!(h.store.state(SENSOR).await, None);
    assert!(next_alert(&mut alerts).await.is_none());

    // The same reading succeeds once storage recovers.
    h.store.set_fail_commits(false);
    let outcome = h.evaluator.evaluate_at(ph(4.0, now), now).await.unwrap();
    assert_eq!(outcome.alert.unwrap().severity, Severity::Critical);

    assert_eq!(h.drain().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Test: concurrent readings for one sensor alert once
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readings_alert_once() {
    let h = Harness::new(AlertPolicy::default()).await;
    let now = Utc::now();

    let outcomes = futures::future::join_all(
        (0..8).map(|_| h.evaluator.evaluate_at(ph(5.0, now), now)),
    )
    .await;

    let alerted = outcomes
        .into_iter()
        .map(Result::unwrap)
        .filter(|o| o.alert.is_some())
        .count();
    assert_eq!(alerted, 1);
    assert_eq!(h.store.alerts().await.len(), 1);
    assert_eq!(h.store.readings().await.len(), 8);

    assert_eq!(h.drain().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Test: re-alert policy repeats a sustained condition after the cooldown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sustained_warning_realerts_after_cooldown() {
    let policy = AlertPolicy {
        cooldown: chrono::Duration::seconds(60),
        cooldown_policy: CooldownPolicy::RealertAfterCooldown,
    };
    let h = Harness::new(policy).await;
    let t0 = Utc::now();
    let secs = chrono::Duration::seconds;

    assert!(h.evaluator.evaluate_at(ph(5.0, t0), t0).await.unwrap().alert.is_some());
    assert!(h
        .evaluator
        .evaluate_at(ph(5.0, t0 + secs(30)), t0 + secs(30))
        .await
        .unwrap()
        .alert
        .is_none());

    let repeat = h
        .evaluator
        .evaluate_at(ph(5.0, t0 + secs(90)), t0 + secs(90))
        .await
        .unwrap();
    let alert = repeat.alert.unwrap();
    assert_eq!(alert.previous_state, Severity::Warning);
    assert_eq!(alert.severity, Severity::Warning);
    assert!(repeat.transition.unwrap().should_notify);

    assert_eq!(h.drain().await.len(), 2);
}

// ---------------------------------------------------------------------------
// Test: change-only policy stays quiet for a sustained condition
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sustained_warning_is_quiet_by_default() {
    let h = Harness::new(AlertPolicy::default()).await;
    let t0 = Utc::now();

    h.evaluator.evaluate_at(ph(5.0, t0), t0).await.unwrap();
    let later = t0 + chrono::Duration::hours(2);
    let outcome = h.evaluator.evaluate_at(ph(5.0, later), later).await.unwrap();
    assert!(outcome.alert.is_none());

    assert_eq!(h.store.alerts().await.len(), 1);
    assert_eq!(h.drain().await.len(), 1);
}
