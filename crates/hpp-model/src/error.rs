//! Error type for model fitting, selection and evaluation.

use std::path::PathBuf;

use hpp_core::Algorithm;
use hpp_data::DataError;
use hpp_tracking::TrackingError;
use thiserror::Error;

/// Failure fitting, selecting, registering or evaluating a model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A hyperparameter has an unusable value.
    #[error("{algorithm}: invalid value for '{name}': {reason}")]
    InvalidParameter {
        /// Algorithm being configured.
        algorithm: Algorithm,
        /// Parameter name.
        name: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// A hyperparameter name is not understood by the algorithm.
    #[error("{algorithm}: unknown parameter '{name}'")]
    UnknownParameter {
        /// Algorithm being configured.
        algorithm: Algorithm,
        /// Parameter name.
        name: String,
    },

    /// There are no rows to fit on.
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    /// The normal equations have no unique solution.
    #[error("{0}: normal equations are singular")]
    Singular(Algorithm),

    /// Cross-validation needs at least one row per fold.
    #[error("{samples} samples cannot be split into {folds} folds")]
    TooFewSamples {
        /// Rows available.
        samples: usize,
        /// Folds requested.
        folds: usize,
    },

    /// The parameter grid expands to no candidates.
    #[error("{0}: parameter grid yields no candidates")]
    NoCandidates(Algorithm),

    /// A fit produced NaN or infinite output.
    #[error("non-finite {0}")]
    NonFinite(String),

    /// The evaluation split has no rows.
    #[error("cannot evaluate on an empty test set")]
    EmptyEvaluationSet,

    /// Every configured algorithm failed.
    #[error("no algorithm trained successfully")]
    NoSuccessfulAlgorithm,

    /// The stored artifact does not match the current feature schema.
    #[error("model artifact schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Reading the split CSVs failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Recording runs or registering the model failed.
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// Writing reports or plots failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Encoding a report failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing the residuals CSV failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
