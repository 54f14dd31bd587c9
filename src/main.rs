//! Application entry point for the `pranamesh-dashboard` backend.
//!
//! Startup sequence:
//! - Load configuration from environment variables or `.env`
//! - Initialize structured logging/tracing
//! - Optionally connect to PostgreSQL and create the archive schema
//! - Build shared state and mount the API via the `routes` gateway
//! - Start the realtime watcher when a store is configured
//! - Bind the Axum HTTP server and serve requests
//!
//! # Environment Variables
//! - `DATABASE_URL` (optional) – PostgreSQL archive; disabled when unset
//! - `DB_POOL_MAX` (optional) – maximum number of DB connections (default: 5)
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the upstream keys and cache lifetimes.
use std::{env, io::IsTerminal, net::SocketAddr, sync::Arc};

use anyhow::Result;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use pranamesh_dashboard::archive::Archive;
use pranamesh_dashboard::realtime::watcher;
use pranamesh_dashboard::routes::{self, AppState};
use pranamesh_dashboard::{config, schema, Config};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let archive = connect_archive(&cfg).await?;
    let state = AppState::from_config(&cfg)?;

    let _watcher = watcher::spawn(
        state.store.clone(),
        state.board.clone(),
        archive,
        cfg.realtime_poll,
    );

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connect the reading archive when `DATABASE_URL` is set.
async fn connect_archive(cfg: &Config) -> Result<Option<Arc<Archive>>> {
    // ---
    let Some(db_url) = cfg.db_url.as_deref() else {
        tracing::info!("DATABASE_URL not set, reading archive disabled");
        return Ok(None);
    };

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;
    Ok(Some(Arc::new(Archive::new(pool))))
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// - Color output: `FORCE_COLOR=1|true|yes` forces it on, `0|false|no`
///   forces it off, anything else auto-detects a TTY
/// - Span events via `AXUM_SPAN_EVENTS`: `"full"`, `"enter_exit"`, or
///   CLOSE only by default
/// - Level from `RUST_LOG`, else `AXUM_LOG_LEVEL` (case-insensitive)
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // RUST_LOG wins; otherwise one level for our crates, quieter transports
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = env::var("AXUM_LOG_LEVEL")
            .map(|v| v.trim().to_ascii_lowercase())
            .ok()
            .filter(|v| matches!(v.as_str(), "trace" | "debug" | "info" | "warn" | "error"))
            .unwrap_or_else(|| "debug".to_string());
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    });

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
