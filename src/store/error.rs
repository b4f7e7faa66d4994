//! Persistence error types.
//!
//! None of these are fatal: the store logs them and keeps serving from
//! memory.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or saving the timer snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The snapshot file could not be read.
    #[error("failed to read snapshot {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file could not be written.
    #[error("failed to write snapshot {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted data is not a valid snapshot.
    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),

    /// The snapshot could not be serialized.
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backing store refused the operation.
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    /// Returns true if the stored data itself is bad (as opposed to I/O).
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}
