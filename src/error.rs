//! Error types surfaced by the economy core and its adapters.
//!
//! Routine gameplay refusals ("cannot afford", "not eligible", unknown ids)
//! are not errors; they come back as outcome values from the `economy`
//! module. The types here cover configuration loading, snapshot decoding,
//! persistence and worker coordination.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[source] serde_json::Error),

    #[error("invalid config: {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to parse snapshot")]
    Parse(#[source] serde_json::Error),

    #[error("failed to encode snapshot")]
    Encode(#[source] serde_json::Error),

    #[error("snapshot version {saved} is older than the minimum compatible version {min}")]
    IncompatibleVersion { saved: u32, min: u32 },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot store I/O failed at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("snapshot store task failed")]
    Join(#[source] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("game worker command channel closed")]
    CommandChannelClosed,

    #[error("game worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("game worker join failed")]
    Join(#[source] tokio::task::JoinError),
}

/// Failure of a snapshot-and-store round trip through the worker.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
