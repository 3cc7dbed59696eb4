use std::path::PathBuf;

use thiserror::Error;

use bite_machine::ConfigError;

use crate::loader::LoadError;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot read {path}: {source}")]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    ConfigSyntax {
        path:   PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{path} line {line}: {source}")]
    Recording {
        path:   PathBuf,
        line:   usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} line {line}: {field} {value} is out of range")]
    RecordingTime {
        path:  PathBuf,
        line:  usize,
        field: &'static str,
        value: f64,
    },

    #[error("cannot write recording: {0}")]
    RecordingWrite(#[source] std::io::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("window: {0}")]
    Window(String),
}

pub type Result<T, E = WatchError> = std::result::Result<T, E>;
