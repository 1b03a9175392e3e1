//! irrigd - irrigation controller daemon
//!
//! Polls the sensor feed into a history log, serves irrigation decisions
//! over HTTP, and triggers the pump when a decision calls for water.

use anyhow::{Context, Result};
use irrigd::config::Config;
use irrigd::lifecycle::{shutdown_signal, Service};
use irrigd::server;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("[BOOT] irrigd v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let service = Service::start(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    let app = server::router(service.app_state(), &config.server.static_dir);

    let shutdown = service.cancellation();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    info!("[BOOT] irrigd ready");
    let served = server::run(listener, app, shutdown).await;

    service.shutdown().await;
    served
}
