//! All tunables of one detection session, deserialisable from a config file.

use serde::{Deserialize, Serialize};

use bite_machine::{ConfigError, MachineConfig, ProximityConfig, SchedulerConfig};

use crate::landmarks::LandmarkLayout;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub machine:   MachineConfig,
    pub proximity: ProximityConfig,
    pub scheduler: SchedulerConfig,
    pub landmarks: LandmarkLayout,
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        if !(self.proximity.fallback_threshold > 0.0) {
            return Err(ConfigError::NonPositive("fallback_threshold"));
        }
        if !(self.proximity.face_width_multiplier > 0.0) {
            return Err(ConfigError::NonPositive("face_width_multiplier"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(DetectionConfig::default().validate(), Ok(()));
    }

    #[test]
    fn non_positive_threshold_rejected() {
        let mut cfg = DetectionConfig::default();
        cfg.proximity.fallback_threshold = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositive("fallback_threshold")));
    }

    #[test]
    fn scheduler_errors_propagate() {
        let mut cfg = DetectionConfig::default();
        cfg.scheduler.headroom = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::Headroom(0.0)));
    }
}
