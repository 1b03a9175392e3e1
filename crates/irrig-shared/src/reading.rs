//! Telemetry readings pulled from the sensor feed.

use serde::{Deserialize, Serialize};

/// One sensor reading as reported by the feed.
///
/// Values are optional: the feed forwards whatever the device published,
/// and a missing key is recorded as an empty cell rather than dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Feed-side creation time, kept verbatim.
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
}

impl Reading {
    /// True when the device published none of the three values.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none() && self.soil_moisture.is_none()
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| x.to_string());
        write!(
            f,
            "temp={} hum={} soil={}",
            show(self.temperature),
            show(self.humidity),
            show(self.soil_moisture)
        )
    }
}
