//! # hpp-tracking - Experiment Tracking and Model Registry
//!
//! A plain directory of JSON files standing in for a tracking server:
//!
//! - [`TrackingStore`] groups [runs](ActiveRun) into experiments and records
//!   their parameters, metrics, tags and artifacts.
//! - [`ModelRegistry`] keeps numbered versions of fitted models with a
//!   deployment [`Stage`] and a SHA-256 digest of each stored artifact.
//!
//! The registry is generic over the artifact type, so this crate does not
//! depend on the model crate; it stores whatever serializes.

pub mod error;
pub mod fsutil;
pub mod registry;
pub mod store;

pub use error::TrackingError;
pub use fsutil::sha256_hex;
pub use registry::{ModelRegistry, ModelVersion, NewVersion, Stage};
pub use store::{ActiveRun, Experiment, RunInfo, RunStatus, TrackingStore};
