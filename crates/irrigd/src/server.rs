//! HTTP server for irrigd

use crate::coordinator::DecisionCoordinator;
use crate::metrics::IrrigMetrics;
use crate::routes;
use crate::state::SharedState;
use anyhow::{Context, Result};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Maximum request body size: 64 KiB
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub coordinator: Arc<DecisionCoordinator>,
    pub state: SharedState,
    pub metrics: Arc<IrrigMetrics>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        coordinator: Arc<DecisionCoordinator>,
        state: SharedState,
        metrics: Arc<IrrigMetrics>,
    ) -> Self {
        Self {
            coordinator,
            state,
            metrics,
            start_time: Instant::now(),
        }
    }
}

/// Build the router: API routes plus the static front-end.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let state = Arc::new(state);

    Router::new()
        .merge(routes::decision_routes())
        .merge(routes::status_routes())
        .merge(routes::health_routes())
        .merge(routes::metrics_routes())
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` fires, then stop accepting connections.
pub async fn run(listener: TcpListener, app: Router, shutdown: CancellationToken) -> Result<()> {
    let addr = listener.local_addr().context("listener has no address")?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}
