//! # Evaluate Subcommand
//!
//! Scores the serving model (Production, else the latest version) on the
//! test split and writes the metrics files, `residuals.csv` and plots.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use hpp_core::PipelineConfig;
use hpp_model::EvaluationReport;

/// Arguments for the evaluate subcommand.
#[derive(Args, Debug, Default)]
pub struct EvaluateArgs {
    /// Write reports here instead of `evaluation.output_dir`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Write plots here instead of `evaluation.plots_dir`.
    #[arg(long)]
    pub plots_dir: Option<PathBuf>,
}

impl EvaluateArgs {
    /// Fold the flags into `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.output_dir {
            config.evaluation.output_dir = dir.clone();
        }
        if let Some(dir) = &self.plots_dir {
            config.evaluation.plots_dir = dir.clone();
        }
    }
}

/// Evaluate and print the scores.
pub fn run(config: &PipelineConfig) -> anyhow::Result<EvaluationReport> {
    let report = hpp_model::evaluate_from_config(config).context("evaluation failed")?;

    let m = &report.metrics;
    println!(
        "Model: {} v{} ({}, {})",
        report.model.name, report.model.version, report.model.model_type, report.model.stage
    );
    println!("Test samples: {}", report.n_samples);
    println!("  RMSE  {:.4}", m.rmse);
    println!("  MAE   {:.4}", m.mae);
    println!("  R2    {:.4}", m.r2);
    println!("  MAPE  {:.2}%", m.mape);
    for path in &report.outputs {
        println!("  wrote {}", path.display());
    }
    Ok(report)
}
