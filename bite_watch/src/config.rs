//! Application configuration, read from an optional TOML file.
//!
//! Every table and field is optional; anything left out keeps its default.
//!
//! ```toml
//! bite_limit = 12
//!
//! [detection.machine]
//! cooldown_ms = 400
//!
//! [detection.scheduler]
//! target_fps = 12
//!
//! [alarm]
//! gain = 0.5
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use bite_detect::DetectionConfig;
use bite_machine::{BiteLimit, ConfigError};

use crate::alarm::AlarmConfig;
use crate::error::{Result, WatchError};
use crate::loader::RetryPolicy;
use crate::sim::SimConfig;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub bite_limit: BiteLimit,
    pub detection:  DetectionConfig,
    pub alarm:      AlarmConfig,
    pub loader:     RetryPolicy,
    pub sim:        SimConfig,
}

impl WatchConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| WatchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: WatchConfig = toml::from_str(&text).map_err(|source| WatchError::ConfigSyntax {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None    => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.detection.validate()?;
        self.alarm.validate()?;
        self.sim.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(text: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f
    }

    #[test]
    fn empty_file_gives_defaults() {
        let f = write_config("");
        assert_eq!(WatchConfig::load(f.path()).unwrap(), WatchConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let f = write_config(
            "bite_limit = 12\n\
             [detection.machine]\n\
             cooldown_ms = 400\n\
             [alarm]\n\
             gain = 0.5\n",
        );
        let cfg = WatchConfig::load(f.path()).unwrap();
        assert_eq!(cfg.bite_limit.get(), 12);
        assert_eq!(cfg.detection.machine.cooldown_ms, 400);
        assert_eq!(cfg.detection.scheduler.target_fps, 15.0);
        assert_eq!(cfg.alarm.gain, 0.5);
        assert_eq!(cfg.alarm.high_hz, 800.0);
    }

    #[test]
    fn zero_limit_is_a_syntax_error() {
        let f = write_config("bite_limit = 0\n");
        assert!(matches!(WatchConfig::load(f.path()), Err(WatchError::ConfigSyntax { .. })));
    }

    #[test]
    fn inconsistent_fps_fails_validation() {
        let f = write_config("[detection.scheduler]\nmin_fps = 30\n");
        assert!(matches!(
            WatchConfig::load(f.path()),
            Err(WatchError::Config(ConfigError::FpsRange { .. }))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WatchConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, WatchError::Read { .. }));
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(WatchConfig::load_or_default(None).unwrap(), WatchConfig::default());
    }
}
