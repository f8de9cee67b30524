use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aquamine_api::config::{LogFormat, ServerConfig};
use aquamine_api::{router, state, ws};
use aquamine_core::scoring::ThresholdTable;
use aquamine_core::state_machine::AlertPolicy;
use aquamine_core::store::RecipientDirectory;
use aquamine_db::PgAlertStore;
use aquamine_events::delivery::channels_from_env;
use aquamine_events::{
    ClientRegistry, EventPublisher, FanOut, LocalPubSub, NotificationDispatcher,
    NotificationQueue, PubSubTransport, RedisPubSub,
};
use aquamine_pipeline::Evaluator;

use state::AppState;

const DEFAULT_LOG_FILTER: &str =
    "aquamine_api=debug,aquamine_pipeline=debug,aquamine_events=debug,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let subscriber = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => subscriber.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let policy = AlertPolicy::from_env().expect("Invalid alert policy configuration");
    tracing::info!(
        cooldown_secs = policy.cooldown.num_seconds(),
        cooldown_policy = %policy.cooldown_policy,
        "Loaded alert policy"
    );

    let thresholds = match &config.thresholds_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .unwrap_or_else(|e| panic!("Failed to read THRESHOLDS_FILE '{path}': {e}"));
            let table = ThresholdTable::from_json(&json)
                .unwrap_or_else(|e| panic!("Invalid THRESHOLDS_FILE '{path}': {e}"));
            tracing::info!(path = %path, "Loaded threshold table");
            table
        }
        None => ThresholdTable::default(),
    };

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = aquamine_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    aquamine_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    aquamine_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Pub/sub ---
    let transport: Arc<dyn PubSubTransport> = match &config.redis_url {
        Some(url) => {
            let bus = RedisPubSub::connect(url)
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Live events use Redis pub/sub");
            Arc::new(bus)
        }
        None => {
            tracing::info!("REDIS_URL not set, live events stay in this process");
            Arc::new(LocalPubSub::default())
        }
    };

    // --- Live clients ---
    let registry = Arc::new(ClientRegistry::new(config.live));
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&registry));

    let fanout_cancel = CancellationToken::new();
    let fanout = FanOut::new(Arc::clone(&transport), Arc::clone(&registry))
        .subscribe()
        .await
        .expect("Failed to subscribe to live event channels");
    let fanout_handle = tokio::spawn(fanout.run(fanout_cancel.clone()));

    // --- Notifications ---
    let channels = channels_from_env(config.notify_send_timeout())
        .expect("Failed to build notification channels");
    let dispatcher = Arc::new(NotificationDispatcher::new(
        channels,
        config.notify_send_timeout(),
    ));

    let store = Arc::new(PgAlertStore::new(pool.clone()));
    let directory: Arc<dyn RecipientDirectory> = store.clone();
    let (queue, queue_worker) = NotificationQueue::new(config.queue, directory, dispatcher);
    let queue_cancel = CancellationToken::new();
    let queue_handle = tokio::spawn(queue_worker.run(queue_cancel.clone()));
    tracing::info!(
        capacity = config.queue.capacity,
        workers = config.queue.workers,
        "Notification queue started"
    );

    // --- Evaluator ---
    let evaluator = Evaluator::new(store, EventPublisher::new(Arc::clone(&transport)))
        .with_thresholds(thresholds)
        .with_policy(policy)
        .with_notifications(queue);

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        evaluator: Arc::new(evaluator),
        registry: Arc::clone(&registry),
    };

    let app = router::build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let drain_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    // Accepted notification jobs are delivered before exit.
    queue_cancel.cancel();
    if tokio::time::timeout(drain_timeout, queue_handle).await.is_err() {
        tracing::warn!("Notification queue did not drain before the shutdown timeout");
    }

    fanout_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), fanout_handle).await;

    let live_count = registry.connection_count().await;
    tracing::info!(live_count, "Closing remaining live connections");
    registry.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
