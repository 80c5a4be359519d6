//! Error types for environment discovery and lookup.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading environment files or querying an index.
///
/// Lookups made during variable resolution never propagate these: they are
/// logged and the lookup counts as a miss.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Environment file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Environment file is not valid JSON.
    #[error("Failed to parse environment file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON with the wrong shape.
    #[error("Invalid environment format: {0}")]
    InvalidFormat(String),

    /// The index itself could not answer.
    #[error("Environment index unavailable: {0}")]
    Unavailable(String),
}
