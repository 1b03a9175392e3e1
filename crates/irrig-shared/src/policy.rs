//! Threshold policy: clamp the model output, then decide irrigate/skip.

use crate::decision::Action;

pub const DEFAULT_THRESHOLD_ML: f64 = 5.0;
pub const MIN_VOLUME_ML: f64 = 0.0;
pub const MAX_VOLUME_ML: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    pub threshold_ml: f64,
    pub min_volume_ml: f64,
    pub max_volume_ml: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            threshold_ml: DEFAULT_THRESHOLD_ML,
            min_volume_ml: MIN_VOLUME_ML,
            max_volume_ml: MAX_VOLUME_ML,
        }
    }
}

impl ThresholdPolicy {
    pub fn with_threshold(threshold_ml: f64) -> Self {
        Self {
            threshold_ml,
            ..Self::default()
        }
    }

    /// Bounds must lie within `[MIN_VOLUME_ML, MAX_VOLUME_ML]` with
    /// `min <= max`; the threshold must be finite.
    pub fn is_valid(&self) -> bool {
        self.threshold_ml.is_finite()
            && self.min_volume_ml >= MIN_VOLUME_ML
            && self.max_volume_ml <= MAX_VOLUME_ML
            && self.min_volume_ml <= self.max_volume_ml
    }

    /// Clamp a raw model output into the dispensable range.
    pub fn clamp(&self, raw_ml: f64) -> f64 {
        raw_ml.clamp(self.min_volume_ml, self.max_volume_ml)
    }

    /// `Irrigate` iff `volume_ml >= threshold_ml`.
    pub fn action_for(&self, volume_ml: f64) -> Action {
        if volume_ml >= self.threshold_ml {
            Action::Irrigate
        } else {
            Action::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_bounds() {
        let p = ThresholdPolicy::default();
        assert_eq!(p.clamp(83.0), 50.0);
        assert_eq!(p.clamp(-4.0), 0.0);
        assert_eq!(p.clamp(7.2), 7.2);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let p = ThresholdPolicy::default();
        assert_eq!(p.action_for(5.0), Action::Irrigate);
        assert_eq!(p.action_for(4.999), Action::Skip);
        assert_eq!(p.action_for(50.0), Action::Irrigate);
        assert_eq!(p.action_for(0.0), Action::Skip);
    }

    #[test]
    fn test_custom_threshold() {
        let p = ThresholdPolicy::with_threshold(10.0);
        assert_eq!(p.action_for(7.2), Action::Skip);
        assert_eq!(p.action_for(10.0), Action::Irrigate);
    }

    #[test]
    fn test_validity() {
        assert!(ThresholdPolicy::default().is_valid());
        assert!(!ThresholdPolicy::with_threshold(f64::NAN).is_valid());
        let inverted = ThresholdPolicy {
            threshold_ml: 5.0,
            min_volume_ml: 10.0,
            max_volume_ml: 1.0,
        };
        assert!(!inverted.is_valid());
    }

    #[test]
    fn test_bounds_outside_dispensable_range_are_invalid() {
        let wide = ThresholdPolicy {
            threshold_ml: 5.0,
            min_volume_ml: -10.0,
            max_volume_ml: 80.0,
        };
        assert!(!wide.is_valid());
        assert!(!ThresholdPolicy {
            max_volume_ml: f64::INFINITY,
            ..ThresholdPolicy::default()
        }
        .is_valid());
        assert!(!ThresholdPolicy {
            min_volume_ml: f64::NAN,
            ..ThresholdPolicy::default()
        }
        .is_valid());

        let narrow = ThresholdPolicy {
            threshold_ml: 5.0,
            min_volume_ml: 1.0,
            max_volume_ml: 30.0,
        };
        assert!(narrow.is_valid());
        assert_eq!(narrow.clamp(83.0), 30.0);
    }
}
