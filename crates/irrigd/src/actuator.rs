//! Pump actuator client and fire-and-forget dispatch pool.
//!
//! Decisions hand volumes to [`ActuationPool::submit`], which never waits
//! on the network. A dispatcher task drains a bounded queue and runs at most
//! `max_in_flight` actuator calls at once. When the queue is full the
//! actuation is shed and the caller gets [`DispatchError::QueueFull`].
//!
//! Outcomes are logged and counted only. They are never retried and never
//! written back into the decision snapshot.

use crate::metrics::IrrigMetrics;
use irrig_shared::IrrigError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// HTTP client for the pump controller
#[derive(Clone)]
pub struct ActuatorClient {
    http: reqwest::Client,
    pump_url: String,
}

impl ActuatorClient {
    pub fn new(pump_url: impl Into<String>, timeout: Duration) -> Result<Self, IrrigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IrrigError::Actuator(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            pump_url: pump_url.into(),
        })
    }

    /// Ask the pump to dispense `volume_ml`.
    pub async fn dispense(&self, volume_ml: f64) -> Result<(), IrrigError> {
        let response = self
            .http
            .get(&self.pump_url)
            .query(&[("vol", volume_ml)])
            .send()
            .await
            .map_err(|e| IrrigError::Actuator(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IrrigError::Actuator(format!("pump returned HTTP {}", status)));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("actuation queue is full")]
    QueueFull,

    #[error("actuation pool is shut down")]
    Closed,
}

/// Bounded pool for detached actuator calls
pub struct ActuationPool {
    tx: mpsc::Sender<f64>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl ActuationPool {
    /// Start the dispatcher. Must be called inside a Tokio runtime.
    pub fn start(
        client: ActuatorClient,
        max_in_flight: usize,
        queue_capacity: usize,
        metrics: Arc<IrrigMetrics>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));

        let dispatcher = tokio::spawn(dispatch_loop(
            rx,
            client,
            permits,
            tracker.clone(),
            cancel.clone(),
            metrics,
        ));

        info!(
            "Actuation pool started (max_in_flight={}, queue_capacity={})",
            max_in_flight, queue_capacity
        );

        Self {
            tx,
            cancel,
            tracker,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Queue an actuation without waiting.
    pub fn submit(&self, volume_ml: f64) -> Result<(), DispatchError> {
        self.tx.try_send(volume_ml).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }

    /// Actuator calls currently running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting work, drain what is queued, and wait up to `grace`
    /// for running calls. Anything still running after that is abandoned.
    pub async fn shutdown(&self, grace: Duration) {
        self.cancel.cancel();

        let dispatcher = self.dispatcher.lock().await.take();
        let drained = tokio::time::timeout(grace, async {
            if let Some(handle) = dispatcher {
                if let Err(e) = handle.await {
                    error!("Actuation dispatcher failed: {}", e);
                }
            }
            self.tracker.wait().await;
        })
        .await;

        match drained {
            Ok(()) => info!("Actuation pool drained"),
            Err(_) => warn!(
                "Abandoning {} in-flight actuation(s) after {:?} grace period",
                self.in_flight(),
                grace
            ),
        }
    }
}

async fn dispatch_loop(
    mut rx: mpsc::Receiver<f64>,
    client: ActuatorClient,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    metrics: Arc<IrrigMetrics>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                rx.close();
                while let Some(volume) = rx.recv().await {
                    launch(volume, &client, &permits, &tracker, &metrics).await;
                }
                break;
            }
            next = rx.recv() => match next {
                Some(volume) => launch(volume, &client, &permits, &tracker, &metrics).await,
                None => break,
            },
        }
    }

    tracker.close();
    debug!("Actuation dispatcher stopped");
}

/// Wait for a free slot, then run one actuator call on the tracker.
async fn launch(
    volume_ml: f64,
    client: &ActuatorClient,
    permits: &Arc<Semaphore>,
    tracker: &TaskTracker,
    metrics: &Arc<IrrigMetrics>,
) {
    let permit = match Arc::clone(permits).acquire_owned().await {
        Ok(p) => p,
        Err(_) => return,
    };

    let client = client.clone();
    let metrics = Arc::clone(metrics);
    tracker.spawn(async move {
        let _permit = permit;
        match client.dispense(volume_ml).await {
            Ok(()) => {
                info!("[Async] Pump called vol={}", volume_ml);
                metrics.record_actuation("ok");
            }
            Err(e) => {
                error!("[Async] Pump call error: {}", e);
                metrics.record_actuation("failed");
            }
        }
    });
}
