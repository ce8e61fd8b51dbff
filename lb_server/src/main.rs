//! Bracket server with in-memory or PostgreSQL storage.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use lb_server::api::{self, AppState};
use lb_server::config::{ServerConfig, StorageBackend};
use lb_server::{logging, metrics};
use league_brackets::db::{BracketRepository, Database, MemoryBracketRepository};
use league_brackets::tournament::{
    EventSink, LogEventSink, MatchResultProcessor, TournamentLifecycleManager,
};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the league bracket server

USAGE:
  lb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:7070]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --storage    BACKEND     memory or postgres          [default: env STORAGE_BACKEND or memory]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE_BACKEND          memory or postgres
  DATABASE_URL             PostgreSQL connection string
  APPLY_SCHEMA             Create tables on startup [default: true]
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  DB_MAX_CONNECTIONS       Pool size and other DB_* pool settings
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let storage: Option<StorageBackend> = pargs.opt_value_from_str("--storage")?;

    let config = ServerConfig::from_env(bind, database_url, storage)?;
    config.validate()?;

    logging::init();

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics on http://{}/metrics", metrics_bind);
    }

    let (repository, database): (Arc<dyn BracketRepository>, Option<Database>) =
        match config.storage {
            StorageBackend::Memory => {
                info!("Using in-memory storage; tournaments are lost on restart");
                (Arc::new(MemoryBracketRepository::new()), None)
            }
            StorageBackend::Postgres => {
                let db = Database::new(&config.database)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
                if config.apply_schema {
                    db.apply_schema().await?;
                }
                info!("Database connected successfully");
                (Arc::new(db.repository()), Some(db))
            }
        };

    let events: Arc<dyn EventSink> = Arc::new(LogEventSink);
    let state = AppState {
        lifecycle: TournamentLifecycleManager::new(repository.clone(), events.clone()),
        results: MatchResultProcessor::new(repository, events),
        database: database.clone(),
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Bracket server ({} storage) running at http://{}. Press Ctrl+C to stop.",
        config.storage, config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Resolves on Ctrl+C; if the handler cannot be installed the server runs
/// until killed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
}
