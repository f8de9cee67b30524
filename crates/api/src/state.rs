use std::sync::Arc;

use aquamine_db::PgAlertStore;
use aquamine_events::ClientRegistry;
use aquamine_pipeline::Evaluator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: aquamine_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Scores readings and drives the per-sensor alert lifecycle.
    pub evaluator: Arc<Evaluator<PgAlertStore>>,
    /// Live-dashboard clients connected to this instance.
    pub registry: Arc<ClientRegistry>,
}
