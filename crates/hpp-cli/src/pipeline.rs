//! # Pipeline Subcommand
//!
//! Runs `load-data`, `train` and `evaluate` in order, stopping at the first
//! failing stage.

use clap::Args;
use hpp_core::PipelineConfig;

use crate::data::LoadDataArgs;

/// Arguments for the pipeline subcommand.
#[derive(Args, Debug, Default)]
pub struct PipelineArgs {
    /// Reuse the split files already under `data.processed_data_path`.
    #[arg(long)]
    pub skip_data: bool,

    /// Stop after training.
    #[arg(long)]
    pub skip_evaluation: bool,
}

/// Run the stages in sequence.
pub fn run(args: &PipelineArgs, config: &PipelineConfig) -> anyhow::Result<()> {
    if args.skip_data {
        tracing::info!("skipping data preparation");
    } else {
        tracing::info!(stage = "load-data", "pipeline stage started");
        crate::data::run(&LoadDataArgs::default(), config)?;
    }

    tracing::info!(stage = "train", "pipeline stage started");
    crate::train::run(config)?;

    if args.skip_evaluation {
        tracing::info!("skipping evaluation");
    } else {
        tracing::info!(stage = "evaluate", "pipeline stage started");
        crate::evaluate::run(config)?;
    }

    tracing::info!("pipeline finished");
    Ok(())
}
