//! # hpp-cli - Housing Price Pipeline Command-Line Interface
//!
//! Drives the offline stages of the pipeline from one YAML configuration.
//!
//! ## Subcommands
//!
//! - `load-data` - Download (or reuse) the dataset, summarize and split it
//! - `train` - Grid/randomized search per algorithm, register the best model
//! - `evaluate` - Score the serving model on the test split, write plots
//! - `pipeline` - `load-data`, `train` and `evaluate` in sequence
//! - `models` - List registry versions and move them between stages
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in the subcommand modules; the work is done by
//!   the domain crates.
//! - Handlers return `anyhow::Result`; any error ends the process with
//!   exit code 1.

pub mod data;
pub mod evaluate;
pub mod models;
pub mod pipeline;
pub mod train;

use std::path::Path;

use anyhow::Context;
use hpp_core::{LogFormat, LoggingConfig, PipelineConfig};
use tracing_subscriber::EnvFilter;

/// Read and validate the configuration at `path`.
///
/// A missing file is an error unless `allow_missing` is set, in which case
/// the built-in defaults are used.
pub fn load_config(path: &Path, allow_missing: bool) -> anyhow::Result<PipelineConfig> {
    if !path.exists() && allow_missing {
        return Ok(PipelineConfig::default());
    }
    PipelineConfig::load(path).with_context(|| format!("loading configuration from {}", path.display()))
}

/// Filter level after applying `-v` flags to the configured level.
pub fn effective_level(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over everything else.
pub fn init_tracing(logging: &LoggingConfig, verbose: u8) {
    let level = effective_level(&logging.level, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
