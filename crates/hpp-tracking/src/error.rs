use std::path::PathBuf;

use thiserror::Error;

/// Failure reading or writing the tracking store or registry.
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Filesystem access failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("serialization error on {path}: {source}")]
    Serialization {
        /// File being encoded or decoded.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Names become directory names and must be path-safe.
    #[error("invalid name '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidName(String),

    /// No run with this id exists in the experiment.
    #[error("run {run_id} not found in experiment '{experiment}'")]
    RunNotFound {
        /// Experiment searched.
        experiment: String,
        /// Requested run id.
        run_id: String,
    },

    /// The registry has no usable version of this model.
    #[error("no registered versions of model '{0}'")]
    ModelNotFound(String),

    /// The requested version does not exist.
    #[error("model '{name}' has no version {version}")]
    VersionNotFound {
        /// Registered model name.
        name: String,
        /// Requested version.
        version: u32,
    },

    /// The stored artifact does not hash to the registered digest.
    #[error("artifact digest mismatch for '{name}' v{version}: expected {expected}, found {actual}")]
    DigestMismatch {
        /// Registered model name.
        name: String,
        /// Version being loaded.
        version: u32,
        /// Digest recorded at registration.
        expected: String,
        /// Digest of the bytes on disk.
        actual: String,
    },
}

impl TrackingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
