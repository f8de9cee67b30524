//! Alert lifecycle through the HTTP API against a real database.
//!
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, post_json};
use serde_json::json;
use sqlx::PgPool;

fn reading(sensor_id: &str, ph: f64) -> serde_json::Value {
    json!({
        "sensor_id": sensor_id,
        "timestamp": chrono::Utc::now(),
        "location": {"lat": -3.75, "lon": 115.45},
        "readings": {"ph": ph, "turbidity": 12.0, "dissolved_gold": 3.0},
        "metadata": {"battery_voltage": 3.9, "signal_strength": -70}
    })
}

// ---------------------------------------------------------------------------
// Test: ingestion drives the alert lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn ingest_warning_then_critical(pool: PgPool) {
    let app = common::build_test_app(pool);

    let normal = post_json(app.clone(), "/api/v1/sensors/readings", reading("AMD-01", 7.2)).await;
    assert_eq!(normal.status(), StatusCode::CREATED);
    let json = body_json(normal).await;
    assert_eq!(json["data"]["anomalies_detected"], 0);
    assert!(json["data"]["alert"].is_null());
    assert_eq!(json["data"]["skipped"][0]["name"], "dissolved_gold");

    let warning = post_json(app.clone(), "/api/v1/sensors/readings", reading("AMD-01", 5.0)).await;
    let json = body_json(warning).await;
    assert_eq!(json["data"]["anomalies_detected"], 1);
    assert_eq!(json["data"]["alert"]["severity"], "warning");
    assert_eq!(json["data"]["alert"]["previous_state"], "normal");

    let repeat = post_json(app.clone(), "/api/v1/sensors/readings", reading("AMD-01", 5.1)).await;
    assert!(body_json(repeat).await["data"]["alert"].is_null());

    let critical = post_json(app.clone(), "/api/v1/sensors/readings", reading("AMD-01", 4.0)).await;
    let json = body_json(critical).await;
    assert_eq!(json["data"]["alert"]["severity"], "critical");
    assert_eq!(json["data"]["alert"]["previous_state"], "warning");

    let list = body_json(get(app.clone(), "/api/v1/alerts").await).await;
    let alerts = list["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["severity"], "critical", "newest first");

    let criticals = body_json(get(app.clone(), "/api/v1/alerts?severity=critical").await).await;
    assert_eq!(criticals["data"].as_array().unwrap().len(), 1);

    let states = body_json(get(app.clone(), "/api/v1/alerts/states").await).await;
    assert_eq!(states["data"][0]["sensor_id"], "AMD-01");
    assert_eq!(states["data"][0]["current_state"], "critical");

    let summary = body_json(get(app, "/api/v1/alerts/summary").await).await;
    assert_eq!(summary["data"]["total_alerts"], 1);
    assert_eq!(summary["data"]["critical_count"], 1);
    assert_eq!(summary["data"]["max_severity"], "critical");
    assert_eq!(summary["data"]["unacknowledged_count"], 2);
}

// ---------------------------------------------------------------------------
// Test: acknowledgment succeeds once, then conflicts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn acknowledge_once(pool: PgPool) {
    let app = common::build_test_app(pool);

    let created = post_json(app.clone(), "/api/v1/sensors/readings", reading("AMD-02", 4.0)).await;
    let id = body_json(created).await["data"]["alert"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/alerts/{id}/acknowledge");

    let first = post_json(app.clone(), &uri, json!({"acknowledged_by": "operator"})).await;
    assert_eq!(first.status(), StatusCode::OK);
    let json = body_json(first).await;
    assert_eq!(json["data"]["acknowledged_by"], "operator");
    assert!(json["data"]["acknowledged_at"].is_string());

    let second = post_json(app.clone(), &uri, json!({"acknowledged_by": "someone"})).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let missing = post_json(
        app.clone(),
        "/api/v1/alerts/999999/acknowledge",
        json!({"acknowledged_by": "operator"}),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let acked = body_json(get(app, "/api/v1/alerts?acknowledged=true").await).await;
    assert_eq!(acked["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: recipients can be created, listed and deactivated
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn recipient_lifecycle(pool: PgPool) {
    let app = common::build_test_app(pool);

    let created = post_json(
        app.clone(),
        "/api/v1/recipients",
        json!({"name": "Site supervisor", "phone": "+6281234567890"}),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let json = body_json(created).await;
    assert_eq!(json["data"]["notify_warning"], true);
    let id = json["data"]["id"].as_i64().unwrap();

    let list = body_json(get(app.clone(), "/api/v1/recipients").await).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let removed = delete(app.clone(), &format!("/api/v1/recipients/{id}")).await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let again = delete(app.clone(), &format!("/api/v1/recipients/{id}")).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let active = body_json(get(app.clone(), "/api/v1/recipients").await).await;
    assert!(active["data"].as_array().unwrap().is_empty());

    let all = body_json(get(app, "/api/v1/recipients?include_inactive=true").await).await;
    assert_eq!(all["data"][0]["is_active"], false);
}

// ---------------------------------------------------------------------------
// Test: reading history is newest first, limited, and 404 for unknown sensors
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reading_history(pool: PgPool) {
    let app = common::build_test_app(pool);

    let start = chrono::Utc::now() - chrono::Duration::minutes(10);
    for (i, ph) in [7.1, 7.2, 7.3].into_iter().enumerate() {
        let mut body = reading("AMD-03", ph);
        body["timestamp"] = json!(start + chrono::Duration::minutes(i as i64));
        let resp = post_json(app.clone(), "/api/v1/sensors/readings", body).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let history = body_json(get(app.clone(), "/api/v1/sensors/AMD-03/readings").await).await;
    let rows = history["data"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["ph"], 7.3, "newest first");
    assert_eq!(rows[2]["ph"], 7.1);
    assert_eq!(rows[0]["signal_strength"], -70);

    let limited =
        body_json(get(app.clone(), "/api/v1/sensors/AMD-03/readings?limit=2").await).await;
    assert_eq!(limited["data"].as_array().unwrap().len(), 2);

    let unknown = get(app, "/api/v1/sensors/AMD-404/readings").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(unknown).await["code"], "NOT_FOUND");
}
