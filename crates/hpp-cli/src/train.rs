//! # Train Subcommand
//!
//! Searches every configured algorithm, records a tracking run per
//! algorithm, then registers the best model and promotes it to Production.

use anyhow::{bail, Context};
use clap::Args;
use hpp_core::{Algorithm, PipelineConfig};
use hpp_model::TrainingReport;

/// Arguments for the train subcommand.
#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// Restrict training to these algorithms (repeatable). Each must be
    /// present in `training.algorithms`.
    #[arg(long = "algorithm", value_name = "NAME")]
    pub algorithms: Vec<Algorithm>,

    /// Group runs under this experiment instead of `tracking.experiment_name`.
    #[arg(long)]
    pub experiment: Option<String>,

    /// Default fold count, overriding `training.cv_folds`.
    #[arg(long, value_parser = clap::value_parser!(u16).range(2..))]
    pub cv_folds: Option<u16>,
}

impl TrainArgs {
    /// Fold the flags into `config`.
    pub fn apply(&self, config: &mut PipelineConfig) -> anyhow::Result<()> {
        if let Some(unknown) = self.algorithms.iter().find(|a| config.algorithm(**a).is_none()) {
            bail!("algorithm '{unknown}' is not listed in training.algorithms");
        }
        if !self.algorithms.is_empty() {
            config
                .training
                .algorithms
                .retain(|a| self.algorithms.contains(&a.algorithm));
        }
        if let Some(name) = &self.experiment {
            config.tracking.experiment_name = name.clone();
        }
        if let Some(k) = self.cv_folds {
            config.training.cv_folds = usize::from(k);
        }
        Ok(())
    }
}

/// Train and print the comparison table.
pub fn run(config: &PipelineConfig) -> anyhow::Result<TrainingReport> {
    let report = hpp_model::train_from_config(config).context("training failed")?;
    print_report(&report);
    Ok(report)
}

fn print_report(report: &TrainingReport) {
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8}",
        "algorithm", "cv_rmse", "val_rmse", "val_mae", "val_r2", "test_rmse", "secs"
    );
    for s in &report.algorithms {
        println!(
            "{:<20} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>8.1}",
            s.algorithm.as_str(),
            s.cv_rmse,
            s.validation.rmse,
            s.validation.mae,
            s.validation.r2,
            s.test.rmse,
            s.training_seconds
        );
    }
    for f in &report.failed {
        println!("{:<20} failed: {}", f.algorithm.as_str(), f.error);
    }
    let best = &report.best_model;
    println!(
        "\nBest model: {} (val_rmse {:.4}), registered as '{}' v{} in Production",
        best.name, best.val_rmse, best.registered_name, best.version
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_filter_keeps_configured_order() {
        let mut config = PipelineConfig::default();
        let args = TrainArgs {
            algorithms: vec![Algorithm::RandomForest, Algorithm::Ridge],
            experiment: Some("ablation".to_string()),
            cv_folds: Some(4),
        };
        args.apply(&mut config).unwrap();
        let kept: Vec<_> = config.training.algorithms.iter().map(|a| a.algorithm).collect();
        assert_eq!(kept, vec![Algorithm::Ridge, Algorithm::RandomForest]);
        assert_eq!(config.tracking.experiment_name, "ablation");
        assert_eq!(config.training.cv_folds, 4);
    }

    #[test]
    fn unconfigured_algorithm_is_rejected() {
        let mut config = PipelineConfig::default();
        config.training.algorithms.retain(|a| a.algorithm == Algorithm::Ridge);
        let args = TrainArgs {
            algorithms: vec![Algorithm::Lasso],
            ..TrainArgs::default()
        };
        let err = args.apply(&mut config).unwrap_err();
        assert!(err.to_string().contains("lasso"));
        assert_eq!(config.training.algorithms.len(), 1);
    }

    #[test]
    fn no_filter_keeps_everything() {
        let mut config = PipelineConfig::default();
        let before = config.training.algorithms.len();
        TrainArgs::default().apply(&mut config).unwrap();
        assert_eq!(config.training.algorithms.len(), before);
    }
}
