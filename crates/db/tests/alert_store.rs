//! Repository and `PgAlertStore` tests against a real PostgreSQL database.
//!
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

use aquamine_core::alert::{Alert, CreateRecipient, NewAlert};
use aquamine_core::reading::{Parameter, Reading};
use aquamine_core::severity::Severity;
use aquamine_core::state_machine::{process, AlertPolicy, SensorAlertState};
use aquamine_core::store::{AlertStore, AlertTransaction, RecipientDirectory};
use aquamine_db::models::alert::AlertFilter;
use aquamine_db::models::reading::ReadingFilter;
use aquamine_db::repositories::{AlertRepo, ReadingRepo, SensorAlertStateRepo, SensorRepo};
use aquamine_db::PgAlertStore;
use chrono::{Timelike, Utc};
use sqlx::PgPool;

fn new_alert(sensor_id: &str, severity: Severity) -> NewAlert {
    NewAlert {
        sensor_id: sensor_id.to_string(),
        severity,
        previous_state: Severity::Normal,
        message: format!("{severity} on {sensor_id}"),
        is_recovery: false,
        created_at: Utc::now(),
    }
}

async fn commit_alert(store: &PgAlertStore, sensor_id: &str, severity: Severity) -> Alert {
    let mut txn = store.begin(sensor_id).await.unwrap();
    let alert = txn.insert_alert(&new_alert(sensor_id, severity)).await.unwrap();
    let mut state = txn.current_state().await.unwrap();
    state.current_state = severity;
    txn.save_state(&state).await.unwrap();
    txn.commit().await.unwrap();
    alert
}

// ---------------------------------------------------------------------------
// Test: begin registers the sensor and starts it in the normal state
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn begin_registers_sensor(pool: PgPool) {
    aquamine_db::health_check(&pool).await.unwrap();
    let store = PgAlertStore::new(pool.clone());

    let mut txn = store.begin("AMD-01").await.unwrap();
    let state = txn.current_state().await.unwrap();
    assert_eq!(state, SensorAlertState::initial("AMD-01"));
    txn.commit().await.unwrap();

    assert!(SensorRepo::find(&pool, "AMD-01").await.unwrap().is_some());
}

// ---------------------------------------------------------------------------
// Test: a full evaluation write round-trips through the database
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn evaluation_writes_are_committed_together(pool: PgPool) {
    let store = PgAlertStore::new(pool.clone());
    let now = Utc::now();
    let reading = Reading::new("AMD-02", now).with_value(Parameter::Ph, 5.0);
    let anomalies = aquamine_core::scoring::ThresholdTable::default().score_reading(&reading);

    let mut txn = store.begin("AMD-02").await.unwrap();
    let state = txn.current_state().await.unwrap();
    let t = process(&state, Some(Severity::Warning), now, &AlertPolicy::default());
    txn.record_reading(&reading).await.unwrap();
    txn.insert_anomalies(&anomalies).await.unwrap();
    let alert = txn
        .insert_alert(&NewAlert::from_transition("AMD-02", &t, "warning".to_string(), now))
        .await
        .unwrap();
    let next = state.apply(&t, now);
    txn.save_state(&next).await.unwrap();
    txn.commit().await.unwrap();

    assert_eq!(alert.severity, Severity::Warning);
    let rows = SensorAlertStateRepo::list(&pool).await.unwrap();
    let reloaded = SensorAlertState::try_from(rows.into_iter().next().unwrap()).unwrap();
    assert_eq!(reloaded.current_state, Severity::Warning);
    assert!(reloaded.last_notification_at.is_some());

    let later = now + chrono::Duration::seconds(30);
    assert_eq!(
        process(&reloaded, Some(Severity::Warning), later, &AlertPolicy::default()),
        process(&next, Some(Severity::Warning), later, &AlertPolicy::default()),
    );
}

// ---------------------------------------------------------------------------
// Test: a dropped transaction rolls back
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn dropped_transaction_rolls_back(pool: PgPool) {
    let store = PgAlertStore::new(pool.clone());
    {
        let mut txn = store.begin("AMD-03").await.unwrap();
        txn.insert_alert(&new_alert("AMD-03", Severity::Critical)).await.unwrap();
    }
    let alerts = AlertRepo::list(&pool, &AlertFilter::default()).await.unwrap();
    assert!(alerts.is_empty());
}

// ---------------------------------------------------------------------------
// Test: acknowledgment happens at most once
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn acknowledge_only_once(pool: PgPool) {
    let store = PgAlertStore::new(pool.clone());
    let alert = commit_alert(&store, "AMD-04", Severity::Warning).await;

    let first = AlertRepo::acknowledge(&pool, alert.id, "operator").await.unwrap();
    assert_eq!(first.unwrap().acknowledged_by.as_deref(), Some("operator"));

    let second = AlertRepo::acknowledge(&pool, alert.id, "someone else").await.unwrap();
    assert!(second.is_none());
    assert_eq!(AlertRepo::unacknowledged_count(&pool).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Test: listing filters by severity and acknowledgment
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_filters(pool: PgPool) {
    let store = PgAlertStore::new(pool.clone());
    commit_alert(&store, "AMD-05", Severity::Warning).await;
    let critical = commit_alert(&store, "AMD-06", Severity::Critical).await;
    AlertRepo::acknowledge(&pool, critical.id, "operator").await.unwrap();

    let warnings = AlertRepo::list(
        &pool,
        &AlertFilter {
            severity: Some(Severity::Warning),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(warnings.len(), 1);

    let acked = AlertRepo::list(
        &pool,
        &AlertFilter {
            acknowledged: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(acked.len(), 1);
    assert_eq!(acked[0].id, critical.id);

    let (warning, critical) = SensorAlertStateRepo::elevated_counts(&pool).await.unwrap();
    assert_eq!((warning, critical), (1, 1));
}

// ---------------------------------------------------------------------------
// Test: recipient opt-in filtering and soft delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn recipients_by_severity(pool: PgPool) {
    let store = PgAlertStore::new(pool.clone());
    let critical_only = aquamine_db::repositories::RecipientRepo::create(
        &pool,
        &CreateRecipient {
            name: "Night shift".to_string(),
            phone: Some("+6281234567890".to_string()),
            email: None,
            notify_warning: false,
            notify_critical: true,
        },
    )
    .await
    .unwrap();

    assert!(store.active_recipients(Severity::Warning).await.unwrap().is_empty());
    assert_eq!(store.active_recipients(Severity::Critical).await.unwrap().len(), 1);
    assert_eq!(store.active_recipients(Severity::Normal).await.unwrap().len(), 1);

    assert!(aquamine_db::repositories::RecipientRepo::deactivate(&pool, critical_only.id)
        .await
        .unwrap());
    assert!(store.active_recipients(Severity::Critical).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: reading history honours the time window and ordering
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reading_history_window(pool: PgPool) {
    let store = PgAlertStore::new(pool.clone());
    // Whole seconds, so values survive the database's microsecond precision.
    let base = Utc::now().with_nanosecond(0).unwrap() - chrono::Duration::hours(1);

    let mut txn = store.begin("AMD-07").await.unwrap();
    for minute in 0..5 {
        let reading = Reading::new("AMD-07", base + chrono::Duration::minutes(minute))
            .with_value(Parameter::Ph, 7.0 + minute as f64 / 10.0);
        txn.record_reading(&reading).await.unwrap();
    }
    txn.commit().await.unwrap();

    let all = ReadingRepo::list_for_sensor(&pool, "AMD-07", &ReadingFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.windows(2).all(|w| w[0].recorded_at > w[1].recorded_at));

    let window = ReadingFilter {
        start: Some(base + chrono::Duration::minutes(1)),
        end: Some(base + chrono::Duration::minutes(3)),
        limit: None,
    };
    let rows = ReadingRepo::list_for_sensor(&pool, "AMD-07", &window).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].recorded_at, base + chrono::Duration::minutes(3));

    let other = ReadingRepo::list_for_sensor(&pool, "AMD-08", &ReadingFilter::default())
        .await
        .unwrap();
    assert!(other.is_empty());
}
