//! Background telemetry poller.
//!
//! Fetches the latest reading every `interval` and appends it to the
//! history log. A failed poll is logged and the loop moves on to the next
//! tick. The poller never touches the decision snapshot.

use crate::feed::FeedClient;
use crate::history::HistoryLog;
use crate::metrics::IrrigMetrics;
use irrig_shared::{IrrigError, Reading};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Poller {
    feed: FeedClient,
    history: Arc<HistoryLog>,
    interval: Duration,
    timeout: Duration,
    metrics: Arc<IrrigMetrics>,
}

impl Poller {
    pub fn new(
        feed: FeedClient,
        history: Arc<HistoryLog>,
        interval: Duration,
        timeout: Duration,
        metrics: Arc<IrrigMetrics>,
    ) -> Self {
        Self {
            feed,
            history,
            interval,
            timeout,
            metrics,
        }
    }

    /// Run until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Poller started: {} every {:?} -> {}",
            self.feed.url(),
            self.interval,
            self.history.path().display()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match tokio::time::timeout(self.timeout, self.feed.fetch_latest()).await {
                        Ok(Ok(reading)) => self.store(reading).await,
                        Ok(Err(e)) => self.fail(&e),
                        Err(_) => self.fail(&IrrigError::Feed(format!(
                            "fetch timed out after {:?}",
                            self.timeout
                        ))),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("Poller shutting down");
                    break;
                }
            }
        }
    }

    async fn store(&self, reading: Reading) {
        let history = Arc::clone(&self.history);
        let row = reading.clone();
        let appended = tokio::task::spawn_blocking(move || history.append(&row))
            .await
            .map_err(|e| IrrigError::History(format!("append task failed: {}", e)))
            .and_then(|r| r);

        match appended {
            Ok(()) => {
                if reading.is_empty() {
                    warn!("Feed entry at {} carried no sensor values", reading.timestamp);
                }
                info!("Fetched @ {}: {}", reading.timestamp, reading);
                self.metrics.record_poll(true);
            }
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&self, err: &IrrigError) {
        error!(kind = err.kind(), transient = err.is_transient(), "Fetch error: {}", err);
        self.metrics.record_poll(false);
    }
}
