use std::path::PathBuf;

use thiserror::Error;

/// Failure acquiring, reading or writing dataset files.
#[derive(Error, Debug)]
pub enum DataError {
    /// Filesystem access failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A CSV file could not be read or written.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The dataset download failed.
    #[error("download from {url} failed: {source}")]
    Download {
        /// Source URL.
        url: String,
        /// Underlying HTTP error.
        source: reqwest::Error,
    },

    /// A required column is absent from a CSV header.
    #[error("missing column '{column}' in {source_name}")]
    MissingColumn {
        /// Column that was expected.
        column: String,
        /// File or stream the header came from.
        source_name: String,
    },

    /// A cell that must be numeric is not.
    #[error("row {row}: column '{column}' is not numeric: '{value}'")]
    Parse {
        /// One-based data row number.
        row: usize,
        /// Column name.
        column: String,
        /// Raw cell contents.
        value: String,
    },

    /// Feature and target columns have different lengths.
    #[error("{features} feature rows but {targets} targets")]
    LengthMismatch {
        /// Number of feature rows.
        features: usize,
        /// Number of targets.
        targets: usize,
    },

    /// The dataset is too small for the requested operation.
    #[error("dataset too small: {0}")]
    TooSmall(String),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
