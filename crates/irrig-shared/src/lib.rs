//! Shared types for the irrigation controller.
//!
//! Everything that crosses a process boundary (HTTP bodies, feed envelopes,
//! history rows) is defined here so the daemon and any client agree on
//! the wire shape.

pub mod decision;
pub mod error;
pub mod policy;
pub mod reading;

pub use decision::{Action, Decision, FeatureVector, PumpStatus, StatusView};
pub use error::IrrigError;
pub use policy::ThresholdPolicy;
pub use reading::Reading;

/// Crate version, reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timestamp format used for decisions (local wall clock).
pub const DECISION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`DECISION_TIME_FORMAT`].
pub fn local_timestamp() -> String {
    chrono::Local::now().format(DECISION_TIME_FORMAT).to_string()
}
