//! Error types for the irrigation controller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrrigError {
    #[error("Model evaluation failed: {0}")]
    Model(String),

    #[error("Feed request failed: {0}")]
    Feed(String),

    #[error("Malformed feed response: {0}")]
    MalformedFeed(String),

    #[error("Actuator call failed: {0}")]
    Actuator(String),

    #[error("History log error: {0}")]
    History(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IrrigError {
    /// Short stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IrrigError::Model(_) => "model",
            IrrigError::Feed(_) => "feed",
            IrrigError::MalformedFeed(_) => "malformed_feed",
            IrrigError::Actuator(_) => "actuator",
            IrrigError::History(_) => "history",
            IrrigError::Io(_) => "io",
        }
    }

    /// Network and upstream-format failures. These are logged and skipped,
    /// never surfaced to an HTTP caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IrrigError::Feed(_) | IrrigError::MalformedFeed(_) | IrrigError::Actuator(_)
        )
    }
}
