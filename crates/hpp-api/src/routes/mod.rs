//! # API Route Modules
//!
//! - `root` - service description.
//! - `prediction` - single and batch predictions.
//! - `health` - liveness and component checks.
//! - `model` - serving model metadata and hot reload.
//! - `monitoring` - aggregates from the request log and the HTML dashboard.
//! - `metrics` - Prometheus scrape endpoint, mounted only when enabled.

pub mod health;
pub mod metrics;
pub mod model;
pub mod monitoring;
pub mod prediction;
pub mod root;
