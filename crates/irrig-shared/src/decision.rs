//! Decision types: the inbound feature vector, the irrigate/skip outcome,
//! and the snapshot served by `/status`.

use serde::{Deserialize, Deserializer, Serialize};

/// Features carried by a decision request.
///
/// Every field is optional on the wire. Absent or `null` values become 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub temperature: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub humidity_env: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub soil_moisture: f64,
}

impl FeatureVector {
    pub fn new(temperature: f64, humidity_env: f64, soil_moisture: f64) -> Self {
        Self {
            temperature,
            humidity_env,
            soil_moisture,
        }
    }

    /// Features in model column order.
    pub fn as_array(&self) -> [f64; 3] {
        [self.temperature, self.humidity_env, self.soil_moisture]
    }
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Outcome of the threshold policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Irrigate,
    Skip,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Irrigate => "IRRIGATE",
            Action::Skip => "SKIP",
        }
    }

    /// Pump status reported for this action.
    ///
    /// `Sent` is optimistic: it is reported as soon as the actuation is
    /// handed off, before the actuator has answered.
    pub fn pump_status(self) -> PumpStatus {
        match self {
            Action::Irrigate => PumpStatus::Sent,
            Action::Skip => PumpStatus::Skipped,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PumpStatus {
    Sent,
    Skipped,
}

/// A complete decision record. Always written and read as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub timestamp: String,
    pub temperature: f64,
    pub humidity_env: f64,
    pub soil_moisture: f64,
    pub volume_ml: f64,
    pub action: Action,
    pub pump_status: PumpStatus,
}

impl Decision {
    /// Build a decision; `pump_status` is derived from `action`.
    pub fn new(
        timestamp: impl Into<String>,
        features: &FeatureVector,
        volume_ml: f64,
        action: Action,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            temperature: features.temperature,
            humidity_env: features.humidity_env,
            soil_moisture: features.soil_moisture,
            volume_ml,
            action,
            pump_status: action.pump_status(),
        }
    }
}

/// JSON shape of `/status`. Every key is present; all are `null` before
/// the first decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub timestamp: Option<String>,
    pub temperature: Option<f64>,
    pub humidity_env: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub volume_ml: Option<f64>,
    pub action: Option<Action>,
    pub pump_status: Option<PumpStatus>,
}

impl StatusView {
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn is_unset(&self) -> bool {
        self.timestamp.is_none()
    }
}

impl From<&Decision> for StatusView {
    fn from(d: &Decision) -> Self {
        Self {
            timestamp: Some(d.timestamp.clone()),
            temperature: Some(d.temperature),
            humidity_env: Some(d.humidity_env),
            soil_moisture: Some(d.soil_moisture),
            volume_ml: Some(d.volume_ml),
            action: Some(d.action),
            pump_status: Some(d.pump_status),
        }
    }
}
