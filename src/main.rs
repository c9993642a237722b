//! odds_stream - Main Entry Point
//!
//! Serves live and resumable odds streams for binary prediction markets.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use odds_stream::config::loader::load_config;
use odds_stream::config::types::{AppConfig, DatabaseConfig};
use odds_stream::pricing::PgConfigStore;
use odds_stream::sequence::PgSequenceStore;
use odds_stream::{server, AppState};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ODDS_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_logging(level: Level, json: bool) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn build_state(config: &AppConfig) -> Result<AppState> {
    let Some(database) = &config.database else {
        warn!("No database configured, using in-memory stores");
        return Ok(AppState::in_memory(config));
    };

    let pool = connect(database).await?;
    Ok(AppState::build(
        Arc::new(PgConfigStore::new(pool.clone())),
        Arc::new(PgSequenceStore::new(pool)),
        config,
    ))
}

async fn connect(database: &DatabaseConfig) -> Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(Duration::from_secs(database.connection_timeout_seconds))
        .connect(&database.url)
        .await
        .context("Failed to connect to database")?;

    if database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        info!("Database migrations applied");
    }
    Ok(pool)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Also picks up a .env file
    let mut config = load_config(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        config.settings.log_level = level;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.settings.log_json |= args.log_json;

    init_logging(
        parse_level(&config.settings.log_level),
        config.settings.log_json,
    )?;

    info!("Starting odds_stream");
    if let Some(path) = &args.config {
        info!("Configuration file: {}", path);
    }

    let state = build_state(&config).await?;
    let listener = TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address()))?;

    server::serve(listener, state).await?;
    Ok(())
}
