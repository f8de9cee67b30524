use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use aquamine_core::reading::Parameter;
use aquamine_core::state_machine::CooldownPolicy;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the database is unreachable. Readings are
    /// rejected with 503 in that state.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Live-dashboard clients connected to this instance.
    pub live_clients: usize,
    /// Parameters that can raise alerts with the loaded threshold table.
    pub monitored_parameters: Vec<Parameter>,
    pub cooldown_policy: CooldownPolicy,
    pub cooldown_secs: i64,
}

/// GET /health -- service, database and alerting configuration.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = aquamine_db::health_check(&state.pool).await.is_ok();
    let policy = state.evaluator.policy();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        live_clients: state.registry.connection_count().await,
        monitored_parameters: state.evaluator.thresholds().monitored(),
        cooldown_policy: policy.cooldown_policy,
        cooldown_secs: policy.cooldown.num_seconds(),
    })
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
