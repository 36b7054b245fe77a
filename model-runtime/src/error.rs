//! Runtime error types

use std::path::PathBuf;

use thiserror::Error;

/// Failure to start a background import
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("an import is already in flight")]
    Busy,

    #[error("failed to spawn import worker: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
