//! # Training Orchestration
//!
//! Runs the hyperparameter search for every configured algorithm, records
//! each as a tracking run, and registers the overall winner.
//!
//! ## Flow
//!
//! 1. For each [`AlgorithmConfig`], open a run named after the algorithm,
//!    [`search`] its grid on the training split, score the refitted winner on
//!    the validation and test splits, and log params, metrics and the
//!    `cv_results.json`, `feature_importance.json` (trees) and `model.json`
//!    artifacts.
//! 2. An algorithm that fails marks its run `FAILED` and is skipped.
//! 3. The algorithm with the lowest validation RMSE is registered and
//!    promoted to `Production`; the previous production version is archived.
//! 4. A [`TrainingReport`] is written to `training.metrics_path`.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use hpp_core::{
    Algorithm, AlgorithmConfig, Hyperparameters, PipelineConfig, SearchStrategy, TrackingConfig, TrainingConfig,
};
use hpp_data::Splits;
use hpp_tracking::{ActiveRun, ModelRegistry, NewVersion, Stage, TrackingStore};
use serde::{Deserialize, Serialize};

use crate::artifact::{feature_map, ModelArtifact};
use crate::error::ModelError;
use crate::metrics::RegressionMetrics;
use crate::report::write_json;
use crate::search::search;

/// How one algorithm fared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSummary {
    /// Algorithm family.
    pub algorithm: Algorithm,
    /// Estimator name, e.g. `Ridge`.
    pub model_type: String,
    /// Tracking run that recorded it.
    pub run_id: String,
    /// Winning hyperparameters.
    pub best_params: Hyperparameters,
    /// Candidates evaluated.
    pub candidates: usize,
    /// Cross-validated RMSE of the winner.
    pub cv_rmse: f64,
    /// Scores on the validation split.
    pub validation: RegressionMetrics,
    /// Scores on the test split.
    pub test: RegressionMetrics,
    /// Wall time of search plus refit.
    pub training_seconds: f64,
}

impl AlgorithmSummary {
    /// Flat metric map, as logged to the run and the registry.
    pub fn metric_map(&self) -> BTreeMap<String, f64> {
        let mut out: BTreeMap<String, f64> = self
            .validation
            .prefixed("val")
            .into_iter()
            .chain(self.test.prefixed("test"))
            .collect();
        out.insert("cv_rmse".to_string(), self.cv_rmse);
        out
    }
}

/// An algorithm that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAlgorithm {
    /// Algorithm family.
    pub algorithm: Algorithm,
    /// Tracking run marked failed.
    pub run_id: String,
    /// Error message.
    pub error: String,
}

/// The registered winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestModel {
    /// Winning algorithm.
    pub name: Algorithm,
    /// Its validation RMSE.
    pub val_rmse: f64,
    /// Registry name it was stored under.
    pub registered_name: String,
    /// Registry version number.
    pub version: u32,
}

/// Result of a training session, written to `training.metrics_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Overall winner.
    pub best_model: BestModel,
    /// Successful algorithms in configuration order.
    pub algorithms: Vec<AlgorithmSummary>,
    /// Skipped algorithms.
    pub failed: Vec<FailedAlgorithm>,
    /// When the session finished.
    pub trained_at: DateTime<Utc>,
}

/// Train on the split files under `data.processed_data_path`.
pub fn train_from_config(config: &PipelineConfig) -> Result<TrainingReport, ModelError> {
    let splits = hpp_data::load_splits(&config.data.processed_data_path)?;
    train(&splits, &config.training, &config.tracking)
}

/// Train every configured algorithm on `splits` and register the best.
pub fn train(
    splits: &Splits,
    training: &TrainingConfig,
    tracking: &TrackingConfig,
) -> Result<TrainingReport, ModelError> {
    let store = TrackingStore::open(&tracking.store_path)?;
    let experiment = store.get_or_create_experiment(&tracking.experiment_name)?;
    tracing::info!(
        experiment = %experiment.name,
        algorithms = training.algorithms.len(),
        train_rows = splits.train.len(),
        "training started"
    );

    let mut summaries = Vec::new();
    let mut failed = Vec::new();
    let mut best: Option<(AlgorithmSummary, ModelArtifact)> = None;

    for config in &training.algorithms {
        let algorithm = config.algorithm;
        let folds = config.cv_folds.unwrap_or(training.cv_folds);
        let mut run = store.start_run(&experiment, algorithm.as_str())?;
        match fit_algorithm(&mut run, config, folds, splits, training.random_state) {
            Ok((summary, artifact)) => {
                run.finish()?;
                let improves = best
                    .as_ref()
                    .map_or(true, |(b, _)| summary.validation.rmse < b.validation.rmse);
                if improves {
                    best = Some((summary.clone(), artifact));
                }
                summaries.push(summary);
            }
            Err(e) => {
                tracing::warn!(%algorithm, error = %e, "algorithm failed, skipping");
                let run_id = run.run_id().to_string();
                run.fail(&e.to_string())?;
                failed.push(FailedAlgorithm {
                    algorithm,
                    run_id,
                    error: e.to_string(),
                });
            }
        }
    }

    let Some((winner, artifact)) = best else {
        return Err(ModelError::NoSuccessfulAlgorithm);
    };
    log_comparison(&summaries);

    let registry = ModelRegistry::new(store.root());
    let name = &tracking.registered_model_name;
    let registered = registry.register(
        name,
        &artifact,
        NewVersion {
            run_id: Some(winner.run_id.clone()),
            algorithm: winner.algorithm,
            params: winner.best_params.clone(),
            metrics: winner.metric_map(),
        },
    )?;
    let promoted = registry.transition_stage(name, registered.version, Stage::Production)?;

    let report = TrainingReport {
        best_model: BestModel {
            name: winner.algorithm,
            val_rmse: winner.validation.rmse,
            registered_name: promoted.name.clone(),
            version: promoted.version,
        },
        algorithms: summaries,
        failed,
        trained_at: Utc::now(),
    };
    write_json(&training.metrics_path, &report)?;
    tracing::info!(
        best = %report.best_model.name,
        val_rmse = report.best_model.val_rmse,
        version = promoted.version,
        path = %training.metrics_path.display(),
        "training complete"
    );
    Ok(report)
}

fn fit_algorithm(
    run: &mut ActiveRun,
    config: &AlgorithmConfig,
    folds: usize,
    splits: &Splits,
    seed: u64,
) -> Result<(AlgorithmSummary, ModelArtifact), ModelError> {
    let algorithm = config.algorithm;
    let started = Instant::now();
    run.set_tag("algorithm", algorithm)?;
    run.log_param("model_type", algorithm.model_type())?;
    run.log_param("cv_folds", folds)?;
    run.log_param(
        "search_strategy",
        match config.search {
            SearchStrategy::Grid => "grid".to_string(),
            SearchStrategy::Random { n_iter } => format!("random(n_iter={n_iter})"),
        },
    )?;

    let outcome = search(algorithm, &config.param_grid, &config.search, folds, &splits.train, seed)?;
    run.log_json_artifact("cv_results.json", &outcome.results)?;
    run.log_params(&outcome.best_params)?;

    let score = |split: &hpp_data::Dataset| {
        RegressionMetrics::compute(split.targets(), &outcome.model.predict(split.features()))
    };
    let validation = score(&splits.validation);
    let test = score(&splits.test);
    if !validation.rmse.is_finite() {
        return Err(ModelError::NonFinite(format!("{algorithm} validation RMSE")));
    }

    let summary = AlgorithmSummary {
        algorithm,
        model_type: algorithm.model_type().to_string(),
        run_id: run.run_id().to_string(),
        best_params: outcome.best_params.clone(),
        candidates: outcome.results.len(),
        cv_rmse: outcome.best_rmse(),
        validation,
        test,
        training_seconds: started.elapsed().as_secs_f64(),
    };
    let metrics = summary.metric_map();
    run.log_metrics(metrics.iter().map(|(k, v)| (k.as_str(), *v)))?;
    run.log_metric("training_seconds", summary.training_seconds)?;

    if let Some(importances) = outcome.model.feature_importances() {
        run.log_json_artifact("feature_importance.json", &feature_map(&importances))?;
    }
    let artifact = ModelArtifact::new(algorithm, outcome.best_params, outcome.model);
    run.log_json_artifact("model.json", &artifact)?;

    tracing::info!(
        %algorithm,
        cv_rmse = summary.cv_rmse,
        val_rmse = validation.rmse,
        val_r2 = validation.r2,
        test_rmse = test.rmse,
        "algorithm trained"
    );
    Ok((summary, artifact))
}

fn log_comparison(summaries: &[AlgorithmSummary]) {
    let mut ranked: Vec<&AlgorithmSummary> = summaries.iter().collect();
    ranked.sort_by(|a, b| a.validation.rmse.total_cmp(&b.validation.rmse));
    for (rank, s) in ranked.iter().enumerate() {
        tracing::info!(
            rank = rank + 1,
            algorithm = %s.algorithm,
            val_rmse = s.validation.rmse,
            val_mae = s.validation.mae,
            val_r2 = s.validation.r2,
            "model comparison"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpp_core::{FeatureVector, ParamValue};
    use hpp_data::Dataset;
    use hpp_tracking::RunStatus;

    fn dataset(offset: usize, n: usize) -> Dataset {
        let features: Vec<FeatureVector> = (offset..offset + n)
            .map(|i| {
                let t = i as f64;
                [
                    1.0 + (t * 0.37) % 9.0,
                    5.0 + (t * 1.7) % 40.0,
                    4.0 + (t * 0.11) % 3.0,
                    1.0 + (t * 0.07) % 0.5,
                    300.0 + (t * 13.0) % 2000.0,
                    2.0 + (t * 0.05) % 2.0,
                    33.0 + (t * 0.13) % 8.0,
                    -123.0 + (t * 0.17) % 8.0,
                ]
            })
            .collect();
        let targets = features.iter().map(|r| 0.4 * r[0] + 0.01 * r[1] + 0.3).collect();
        Dataset::new(features, targets).unwrap()
    }

    fn splits() -> Splits {
        Splits {
            train: dataset(0, 150),
            validation: dataset(150, 40),
            test: dataset(190, 40),
        }
    }

    fn algorithm(algorithm: Algorithm, grid: &[(&str, Vec<ParamValue>)]) -> AlgorithmConfig {
        AlgorithmConfig {
            algorithm,
            cv_folds: None,
            search: SearchStrategy::Grid,
            param_grid: grid.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    fn configs(dir: &std::path::Path, algorithms: Vec<AlgorithmConfig>) -> (TrainingConfig, TrackingConfig) {
        let training = TrainingConfig {
            cv_folds: 3,
            random_state: 7,
            metrics_path: dir.join("reports").join("training_metrics.json"),
            algorithms,
        };
        let tracking = TrackingConfig {
            store_path: dir.join("mlruns"),
            ..TrackingConfig::default()
        };
        (training, tracking)
    }

    fn mixed() -> Vec<AlgorithmConfig> {
        vec![
            algorithm(Algorithm::DecisionTree, &[("max_depth", vec![ParamValue::Int(3), ParamValue::Int(5)])]),
            algorithm(Algorithm::LinearRegression, &[("fit_intercept", vec![ParamValue::Bool(true)])]),
            algorithm(Algorithm::Lasso, &[("not_a_param", vec![ParamValue::Int(1)])]),
        ]
    }

    #[test]
    fn registers_the_lowest_validation_error_model() {
        let dir = tempfile::tempdir().unwrap();
        let (training, tracking) = configs(dir.path(), mixed());
        let report = train(&splits(), &training, &tracking).unwrap();

        assert_eq!(report.best_model.name, Algorithm::LinearRegression);
        assert_eq!(report.best_model.version, 1);
        assert_eq!(report.algorithms.len(), 2);
        assert_eq!(report.algorithms[0].candidates, 2);
        assert!(report.best_model.val_rmse < 1e-6);

        let registry = ModelRegistry::new(&tracking.store_path);
        let serving = registry.serving_version(&tracking.registered_model_name).unwrap();
        assert_eq!(serving.stage, Stage::Production);
        assert_eq!(serving.algorithm, Algorithm::LinearRegression);
        assert!(serving.metrics.contains_key("test_r2"));
        let artifact: ModelArtifact = registry.load_artifact(&serving).unwrap();
        artifact.check_schema().unwrap();
    }

    #[test]
    fn failed_algorithm_marks_its_run() {
        let dir = tempfile::tempdir().unwrap();
        let (training, tracking) = configs(dir.path(), mixed());
        let report = train(&splits(), &training, &tracking).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].algorithm, Algorithm::Lasso);

        let store = TrackingStore::open(&tracking.store_path).unwrap();
        let experiment = store.get_or_create_experiment(&tracking.experiment_name).unwrap();
        let run = store.get_run(&experiment, &report.failed[0].run_id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.tags["error"].contains("not_a_param"));

        let tree_run = store.get_run(&experiment, &report.algorithms[0].run_id).unwrap();
        assert_eq!(tree_run.status, RunStatus::Finished);
        assert_eq!(tree_run.params["model_type"], "DecisionTreeRegressor");
        assert!(tree_run.artifacts.iter().any(|a| a == "feature_importance.json"));
        assert!(tree_run.artifacts.iter().any(|a| a == "cv_results.json"));
        assert!(tree_run.metrics.contains_key("val_rmse"));
    }

    #[test]
    fn writes_the_metrics_report() {
        let dir = tempfile::tempdir().unwrap();
        let (training, tracking) = configs(dir.path(), mixed());
        train(&splits(), &training, &tracking).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&training.metrics_path).unwrap()).unwrap();
        assert_eq!(json["best_model"]["name"], "linear_regression");
        assert!(json["best_model"]["val_rmse"].is_number());
        assert_eq!(json["algorithms"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn retraining_archives_the_previous_production_version() {
        let dir = tempfile::tempdir().unwrap();
        let (training, tracking) = configs(dir.path(), mixed());
        train(&splits(), &training, &tracking).unwrap();
        let second = train(&splits(), &training, &tracking).unwrap();
        assert_eq!(second.best_model.version, 2);

        let registry = ModelRegistry::new(&tracking.store_path);
        let versions = registry.versions(&tracking.registered_model_name).unwrap();
        assert_eq!(versions[0].stage, Stage::Archived);
        assert_eq!(versions[1].stage, Stage::Production);
    }

    #[test]
    fn nothing_trains_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (training, tracking) = configs(
            dir.path(),
            vec![algorithm(Algorithm::Ridge, &[("alpha", vec![ParamValue::Float(-1.0)])])],
        );
        let err = train(&splits(), &training, &tracking).unwrap_err();
        assert!(matches!(err, ModelError::NoSuccessfulAlgorithm));
        assert!(!training.metrics_path.exists());
    }
}
