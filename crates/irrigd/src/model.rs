//! Volume prediction model.
//!
//! The trained pipeline (standard scaler followed by a linear regressor) is
//! exported to JSON at training time and loaded here once at startup:
//!
//! ```json
//! {
//!   "scaler":    { "means": [28.1, 61.4, 35.2], "scales": [4.2, 12.9, 14.7] },
//!   "regressor": { "intercept": 9.8, "coefficients": [2.1, -1.7, -6.3] }
//! }
//! ```
//!
//! Feature order is `temperature, humidity_env, soil_moisture`.

use irrig_shared::{FeatureVector, IrrigError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Maps a feature vector to a raw (unclamped) volume estimate in ml.
pub trait VolumeModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64, IrrigError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: [f64; 3],
    pub scales: [f64; 3],
}

impl StandardScaler {
    fn transform(&self, x: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for i in 0..3 {
            out[i] = (x[i] - self.means[i]) / self.scales[i];
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub intercept: f64,
    pub coefficients: [f64; 3],
}

/// Scaler + regressor, as exported from training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPipeline {
    pub scaler: StandardScaler,
    pub regressor: LinearRegressor,
}

impl LinearPipeline {
    /// Load and validate a pipeline artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IrrigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IrrigError::Model(format!("cannot read model {}: {}", path.display(), e))
        })?;
        let pipeline = Self::from_json(&content)?;
        info!(
            "Loaded regression pipeline from {} (intercept={})",
            path.display(),
            pipeline.regressor.intercept
        );
        Ok(pipeline)
    }

    pub fn from_json(content: &str) -> Result<Self, IrrigError> {
        let pipeline: LinearPipeline = serde_json::from_str(content)
            .map_err(|e| IrrigError::Model(format!("invalid model artifact: {}", e)))?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    fn validate(&self) -> Result<(), IrrigError> {
        let all_finite = self
            .scaler
            .means
            .iter()
            .chain(self.scaler.scales.iter())
            .chain(self.regressor.coefficients.iter())
            .chain(std::iter::once(&self.regressor.intercept))
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(IrrigError::Model("model parameters must be finite".into()));
        }
        if self.scaler.scales.iter().any(|s| *s == 0.0) {
            return Err(IrrigError::Model("scaler has a zero scale".into()));
        }
        Ok(())
    }
}

impl VolumeModel for LinearPipeline {
    fn predict(&self, features: &FeatureVector) -> Result<f64, IrrigError> {
        let x = features.as_array();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(IrrigError::Model(format!(
                "non-finite input features: {:?}",
                x
            )));
        }

        let z = self.scaler.transform(x);
        let y = self.regressor.intercept
            + z.iter()
                .zip(self.regressor.coefficients.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>();

        if !y.is_finite() {
            return Err(IrrigError::Model(format!("prediction is not finite: {}", y)));
        }
        Ok(y)
    }
}
