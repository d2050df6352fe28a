#![deny(missing_docs)]

//! # hpp-model - Regression Models, Training and Evaluation
//!
//! Everything between the split CSVs and a registered, evaluated model.
//!
//! ## Estimators
//!
//! | Algorithm           | Type                     | Hyperparameters |
//! |---------------------|--------------------------|-----------------|
//! | `linear_regression` | [`LinearModel`]          | `fit_intercept` |
//! | `ridge`             | [`LinearModel`]          | `alpha`, `fit_intercept` |
//! | `lasso`             | [`LinearModel`]          | `alpha`, `max_iter`, `tol`, `fit_intercept` |
//! | `decision_tree`     | [`DecisionTree`]         | `max_depth`, `min_samples_split`, `min_samples_leaf`, `max_features` |
//! | `random_forest`     | [`RandomForest`]         | the tree parameters plus `n_estimators`, `bootstrap` |
//!
//! Linear models standardize their inputs with a [`StandardScaler`] that is
//! serialized with the model. Unknown hyperparameter names are errors.
//!
//! ## Stages
//!
//! - [`train`](train::train): grid or randomized search with k-fold
//!   cross-validation per algorithm, one tracking run each, winner by
//!   validation RMSE registered and promoted to production.
//! - [`evaluate`](evaluate::evaluate): test-set metrics, residual analysis and
//!   SVG plots for the serving version.
//!
//! ## Determinism
//!
//! All randomness (candidate sampling, bootstrap rows, feature subsets) flows
//! from `training.random_state` through seeded `StdRng`s, so the same
//! configuration and splits reproduce the same models.

pub mod artifact;
pub mod cv;
pub mod error;
pub mod evaluate;
pub mod forest;
mod hyper;
mod linalg;
pub mod linear;
pub mod metrics;
pub mod plot;
pub mod regressor;
mod report;
pub mod scaler;
pub mod search;
pub mod train;
pub mod tree;

pub use artifact::{feature_map, ModelArtifact};
pub use cv::{cross_validate, kfold, CvScore, Fold};
pub use error::ModelError;
pub use evaluate::{evaluate, evaluate_from_config, EvaluationMetrics, EvaluationReport, ImportanceKind};
pub use forest::RandomForest;
pub use linear::{LinearModel, Penalty};
pub use metrics::{RegressionMetrics, ResidualStats};
pub use regressor::Regressor;
pub use scaler::StandardScaler;
pub use search::{candidates, expand_grid, search, CandidateResult, SearchOutcome};
pub use train::{train, train_from_config, AlgorithmSummary, BestModel, FailedAlgorithm, TrainingReport};
pub use tree::DecisionTree;
