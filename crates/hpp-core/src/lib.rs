#![deny(missing_docs)]

//! # hpp-core - Foundational Types for the Housing Price Pipeline
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies, only `serde`, `serde_json`, `serde_yaml`, `thiserror`
//! and `chrono` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **One feature schema.** [`FEATURE_SPECS`] is the single definition of
//!    the eight covariates, their column order and their accepted ranges. The
//!    loader, the trainer and the prediction service all index through it.
//!
//! 2. **Validation names the field.** [`ValidationError`] always carries the
//!    offending field and the violated constraint, so the service can turn it
//!    into a structured 4xx body without string parsing.
//!
//! 3. **One [`Algorithm`] enum.** Training configuration, tracking runs and the
//!    registry all refer to algorithms through it.
//!
//! 4. **[`HppError`] hierarchy.** Structured errors with `thiserror`, no
//!    `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod features;
pub mod params;
pub mod temporal;

pub use algorithm::Algorithm;
pub use config::{
    AlgorithmConfig, ApiConfig, DataConfig, EvaluationConfig, LogFormat, LoggingConfig,
    MonitoringConfig, PipelineConfig, SearchStrategy, TrackingConfig, TrainingConfig,
};
pub use error::{ConfigError, HppError, ValidationError};
pub use features::{
    FeatureSpec, FeatureVector, HousingFeatures, FEATURE_NAMES, FEATURE_SPECS, N_FEATURES,
    TARGET_COLUMN,
};
pub use params::{Hyperparameters, ParamGrid, ParamValue};
pub use temporal::{format_timestamp, now_timestamp};
