//! Service lifecycle: wire components together, start background tasks,
//! and tear them down in order.

use crate::actuator::{ActuationPool, ActuatorClient};
use crate::config::Config;
use crate::coordinator::DecisionCoordinator;
use crate::feed::FeedClient;
use crate::history::HistoryLog;
use crate::metrics::IrrigMetrics;
use crate::model::{LinearPipeline, VolumeModel};
use crate::poller::Poller;
use crate::server::AppState;
use crate::state::{SharedState, StateStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Running daemon components
pub struct Service {
    pub state: SharedState,
    pub metrics: Arc<IrrigMetrics>,
    pub coordinator: Arc<DecisionCoordinator>,
    actuation: Arc<ActuationPool>,
    poller: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    grace: Duration,
}

impl Service {
    /// Load the model artifact named in `config` and start.
    pub fn start(config: &Config) -> Result<Self> {
        let model = LinearPipeline::load(&config.model.path)
            .context("Failed to load prediction model")?;
        Self::start_with_model(config, Arc::new(model))
    }

    /// Start with a caller-supplied model.
    pub fn start_with_model(config: &Config, model: Arc<dyn VolumeModel>) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let metrics = Arc::new(IrrigMetrics::new().context("Failed to register metrics")?);
        let state: SharedState = Arc::new(StateStore::new());
        let cancel = CancellationToken::new();

        let history = HistoryLog::open(&config.history.path).with_context(|| {
            format!("Failed to open history log {}", config.history.path.display())
        })?;

        let feed = FeedClient::new(config.feed.url(), config.feed.timeout())
            .context("Failed to create feed client")?;

        let actuator = ActuatorClient::new(config.actuator.pump_url(), config.actuator.timeout())
            .context("Failed to create actuator client")?;

        let actuation = Arc::new(ActuationPool::start(
            actuator,
            config.actuator.max_in_flight,
            config.actuator.queue_capacity,
            Arc::clone(&metrics),
        ));

        let coordinator = Arc::new(DecisionCoordinator::new(
            model,
            config.policy.to_policy(),
            Arc::clone(&state),
            Arc::clone(&actuation),
            Arc::clone(&metrics),
        ));

        let poller = Poller::new(
            feed,
            Arc::new(history),
            config.feed.poll_interval(),
            config.feed.timeout(),
            Arc::clone(&metrics),
        )
        .spawn(cancel.child_token());

        info!(
            "Service started (threshold={} ml, actuator={})",
            config.policy.threshold_ml,
            config.actuator.pump_url()
        );

        Ok(Self {
            state,
            metrics,
            coordinator,
            actuation,
            poller: Some(poller),
            cancel,
            grace: config.shutdown_grace(),
        })
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.state),
            Arc::clone(&self.metrics),
        )
    }

    /// Token that fires when the service begins shutting down.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the poller, then drain the actuation pool within the grace period.
    pub async fn shutdown(mut self) {
        info!("Shutting down service");
        self.cancel.cancel();

        if let Some(handle) = self.poller.take() {
            if let Err(e) = handle.await {
                error!("Poller task failed: {}", e);
            }
        }

        self.actuation.shutdown(self.grace).await;
        info!("Service stopped");
    }
}

/// Resolve on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
