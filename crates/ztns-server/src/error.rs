//! Runner error types.

use std::{fmt, path::PathBuf};

use ztns_core::{ConfigError, SnapshotError};

/// Errors that can occur while hosting the simulator.
#[derive(Debug)]
pub enum ServerError {
    /// Invalid simulation tunables
    Config(ConfigError),

    /// Invalid runner setting
    Runner(String),

    /// Snapshot could not be encoded, decoded or rebuilt
    Snapshot(SnapshotError),

    /// Snapshot file could not be read or written
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {}", err),
            Self::Runner(msg) => write!(f, "runner error: {}", msg),
            Self::Snapshot(err) => write!(f, "snapshot error: {}", err),
            Self::Io { path, source } => write!(f, "i/o error on {}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Snapshot(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Runner(_) => None,
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<SnapshotError> for ServerError {
    fn from(err: SnapshotError) -> Self {
        Self::Snapshot(err)
    }
}
