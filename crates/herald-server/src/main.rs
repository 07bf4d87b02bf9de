//! Herald router binary.
//!
//! Loads configuration, connects to the subscriber and stream databases
//! with retry, and runs the consumer loop until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use herald_db::{connect_with_retry, run_migrations, DbPool, DbRuntimeSettings};
use herald_server::config::{self, DatabaseConfig};
use herald_server::consumer::StreamConsumer;
use herald_server::dispatch::DispatchScheduler;
use herald_server::stats::PipelineStats;
use herald_server::worker::WorkerPool;
use herald_stream::{AlertPublisher, SqliteStreamStore, StreamStore};
use herald_subscribers::{SqliteSubscriberStore, SubscriberSource};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("HERALD_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

/// Connects with retry and applies migrations. Exits the process on failure.
async fn open_database(path: String, db: &DatabaseConfig) -> DbPool {
    let settings = DbRuntimeSettings {
        busy_timeout_ms: db.busy_timeout_ms,
        pool_max_size: db.pool_max_size,
        ..DbRuntimeSettings::default()
    };
    let attempts = db.connect_attempts;
    let delay = Duration::from_secs(db.connect_retry_secs);

    let pool = tokio::task::spawn_blocking(move || {
        connect_with_retry(&path, settings, attempts, delay)
    })
    .await
    .expect("database connect task panicked")
    .expect("failed to connect to database: check database.path in config");

    let conn = pool
        .get()
        .expect("failed to get database connection for migrations");
    let applied = run_migrations(&conn).expect("failed to run database migrations");
    if applied > 0 {
        tracing::info!(count = applied, "applied database migrations");
    }
    drop(conn);

    pool
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the router cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let subscriber_pool = open_database(config.database.path.clone(), &config.database).await;
    let stream_pool = if config.stream_db_path() == config.database.path {
        subscriber_pool.clone()
    } else {
        open_database(config.stream_db_path().to_string(), &config.database).await
    };

    let stats = Arc::new(PipelineStats::new());
    let subscribers: Arc<dyn SubscriberSource> =
        Arc::new(SqliteSubscriberStore::new(subscriber_pool));
    let streams: Arc<dyn StreamStore> = Arc::new(SqliteStreamStore::new(stream_pool));

    let publisher = AlertPublisher::new(streams.clone(), config.streams.outbound.clone());
    let scheduler = DispatchScheduler::new(
        subscribers,
        publisher,
        WorkerPool::new(config.dispatch.workers),
        config.dispatch.batch_size,
        stats.clone(),
    );
    let consumer = StreamConsumer::new(
        streams,
        scheduler,
        config.consumer_settings(),
        stats.clone(),
    );

    if config.server.enabled {
        let addr = SocketAddr::new(config.server.host, config.server.port);
        let listener = TcpListener::bind(addr)
            .await
            .expect("failed to bind health endpoint: is another process using this port?");
        tracing::info!(%addr, "serving health endpoint");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, herald_server::app(stats)).await {
                tracing::error!(error = %e, "health endpoint stopped");
            }
        });
    }

    tracing::info!(
        inbound = %config.streams.inbound,
        outbound = %config.streams.outbound,
        workers = config.dispatch.workers,
        batch_size = config.dispatch.batch_size,
        "starting herald router"
    );

    tokio::select! {
        () = consumer.run() => {}
        () = shutdown_signal() => {}
    }

    tracing::info!("herald router shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
        () = terminate => { tracing::info!("received SIGTERM, shutting down"); }
    }
}
