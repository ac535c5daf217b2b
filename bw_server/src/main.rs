//! Barangay crime-report dashboard server.
//!
//! Serves the JSON API over PostgreSQL, or over in-memory storage when no
//! database URL is configured.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use barangay_watch::{auth::LogDelivery, db::Database};
use bw_server::{
    api::{self, AppState, Repositories},
    config::ServerConfig,
    logging, metrics,
};
use pico_args::Arguments;

const HELP: &str = "\
Run the barangay crime-report dashboard server

USAGE:
  bw_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL, in-memory if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required, 32+ chars)
  PASSWORD_PEPPER          Password hashing pepper (required, 16+ chars)
  METRICS_BIND             Prometheus exporter address (optional)
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

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

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    tracing::info!("Starting barangay dashboard server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        tracing::info!("Prometheus metrics exported on http://{}/metrics", addr);
    }

    let database = match &config.database {
        Some(db_config) => {
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            tracing::info!("Database connected and migrated");
            Some(Arc::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage, data is lost on exit");
            None
        }
    };

    let repositories = match &database {
        Some(db) => Repositories::postgres(db),
        None => Repositories::in_memory(),
    };
    let state = AppState::new(
        &config,
        repositories,
        database.clone(),
        Arc::new(LogDelivery),
    );

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    tracing::info!("Shutting down server...");
    if let Some(db) = database.and_then(Arc::into_inner) {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
