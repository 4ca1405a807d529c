mod bootstrap;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use storeline_core::config::{AppConfig, LoadOptions};
use storeline_sessions::spawn_sweeper;

fn init_logging(config: &AppConfig) {
    use storeline_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let sweeper = spawn_sweeper(
        Arc::clone(&app.sessions),
        std::time::Duration::from_secs(app.config.sessions.sweep_interval_secs),
    );

    let state = routes::AppState { engine: app.engine, sessions: app.sessions };
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "storeline-server listening for call webhooks"
    );

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    sweeper.abort();
    info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "storeline-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
