//! Decision coordinator: features in, decision out, pump call on the side.

use crate::actuator::ActuationPool;
use crate::metrics::IrrigMetrics;
use crate::model::VolumeModel;
use crate::state::StateStore;
use irrig_shared::{local_timestamp, Action, Decision, FeatureVector, IrrigError, ThresholdPolicy};
use std::sync::Arc;
use tracing::{info, warn};

pub struct DecisionCoordinator {
    model: Arc<dyn VolumeModel>,
    policy: ThresholdPolicy,
    state: Arc<StateStore>,
    actuation: Arc<ActuationPool>,
    metrics: Arc<IrrigMetrics>,
}

impl DecisionCoordinator {
    pub fn new(
        model: Arc<dyn VolumeModel>,
        policy: ThresholdPolicy,
        state: Arc<StateStore>,
        actuation: Arc<ActuationPool>,
        metrics: Arc<IrrigMetrics>,
    ) -> Self {
        Self {
            model,
            policy,
            state,
            actuation,
            metrics,
        }
    }

    /// Evaluate one feature vector.
    ///
    /// Only a model failure is returned as an error. Actuation is queued on
    /// the pool and its outcome never reaches the caller; `pump_status` is
    /// `SENT` as soon as the call is handed off.
    pub async fn evaluate(&self, features: FeatureVector) -> Result<Decision, IrrigError> {
        let raw = self.model.predict(&features)?;
        if !raw.is_finite() {
            return Err(IrrigError::Model(format!("prediction is not finite: {}", raw)));
        }
        let volume_ml = self.policy.clamp(raw);
        let action = self.policy.action_for(volume_ml);

        if action == Action::Irrigate {
            if let Err(e) = self.actuation.submit(volume_ml) {
                warn!("Actuation for {} ml not dispatched: {}", volume_ml, e);
                self.metrics.record_actuation("shed");
            }
        }

        let decision = Decision::new(local_timestamp(), &features, volume_ml, action);
        self.state.set(decision.clone()).await;

        self.metrics
            .decisions_total
            .with_label_values(&[action.as_str()])
            .inc();
        self.metrics.last_volume_ml.set(volume_ml);

        info!(
            "Decision: raw={:.3} volume_ml={:.3} action={} features=({}, {}, {})",
            raw,
            volume_ml,
            action,
            features.temperature,
            features.humidity_env,
            features.soil_moisture
        );

        Ok(decision)
    }
}
