//! Lapline dashboard server
//!
//! Loads one telemetry export and serves it over HTTP and WebSocket.

mod config;
mod routes;

use anyhow::{Context, Result};
use lapline_core::session::TelemetrySession;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::routes::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Lapline server v{}", lapline_core::VERSION);

    let config = ServerConfig::from_env()?;
    let session = TelemetrySession::load(&config.telemetry_file).with_context(|| {
        format!(
            "Failed to load telemetry from {}",
            config.telemetry_file.display()
        )
    })?;

    let report = session.load_report();
    if report.rows_skipped > 0 {
        warn!(
            "{} of {} telemetry rows were malformed and skipped",
            report.rows_skipped, report.rows_read
        );
    }

    let shutdown = CancellationToken::new();
    let app = router(AppState::new(session, shutdown.clone()));

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C and stop every running replay
async fn wait_for_shutdown(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
    shutdown.cancel();
}
