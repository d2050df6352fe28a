//! # Offline Evaluation
//!
//! Scores the serving model on the held-out test split and writes the
//! evaluation report:
//!
//! | File                                | Contents                                   |
//! |-------------------------------------|--------------------------------------------|
//! | `evaluation_metrics.json`           | [`EvaluationReport`]                       |
//! | `metrics.json`                      | `test_rmse`, `test_mae`, `test_r2`, `test_mape` |
//! | `residuals.csv`                     | actual, predicted, residual per row        |
//! | `plots/residuals.svg`               | residual vs predicted                      |
//! | `plots/residual_histogram.svg`      | residual distribution                      |
//! | `plots/feature_importance.svg`      | importance profile                         |
//! | `plots/predictions.svg`             | actual vs predicted                        |
//!
//! The model is whatever [`ModelRegistry::serving_version`] resolves to, and
//! its artifact digest is verified before use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hpp_core::{Algorithm, EvaluationConfig, FeatureVector, Hyperparameters, PipelineConfig, FEATURE_NAMES};
use hpp_data::{Dataset, SplitKind};
use hpp_tracking::{ModelRegistry, Stage};
use serde::{Deserialize, Serialize};

use crate::artifact::{feature_map, ModelArtifact};
use crate::error::ModelError;
use crate::metrics::{mape, residuals, RegressionMetrics, ResidualStats};
use crate::plot::{self, Reference};
use crate::report::{ensure_parent, write_json, write_text};

/// Detailed report file name.
pub const EVALUATION_FILE: &str = "evaluation_metrics.json";
/// Flat metrics file name.
pub const METRICS_FILE: &str = "metrics.json";
/// Per-row residuals file name.
pub const RESIDUALS_FILE: &str = "residuals.csv";

const HISTOGRAM_BINS: usize = 30;

/// Registry identity of the evaluated model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedModel {
    /// Registered name.
    pub name: String,
    /// Registry version.
    pub version: u32,
    /// Stage at evaluation time.
    pub stage: Stage,
    /// Algorithm family.
    pub algorithm: Algorithm,
    /// Estimator name.
    pub model_type: String,
    /// Hyperparameters.
    pub params: Hyperparameters,
    /// SHA-256 of the stored artifact.
    pub digest: String,
    /// When it was trained.
    pub trained_at: DateTime<Utc>,
}

/// Test-set scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Coefficient of determination.
    pub r2: f64,
    /// Mean absolute percentage error, in percent.
    pub mape: f64,
    /// Residual distribution.
    #[serde(flatten)]
    pub residuals: ResidualStats,
}

/// Where the importance profile comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceKind {
    /// Impurity decrease, from tree models.
    Impurity,
    /// Normalized absolute standardized coefficients, from linear models.
    AbsCoefficient,
}

/// Contents of `evaluation_metrics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Model evaluated.
    pub model: EvaluatedModel,
    /// Rows in the test split.
    pub n_samples: usize,
    /// Scores.
    pub metrics: EvaluationMetrics,
    /// Source of `feature_importance`.
    pub importance_kind: ImportanceKind,
    /// Importance per feature name.
    pub feature_importance: BTreeMap<String, f64>,
    /// Files written besides this report.
    pub outputs: Vec<PathBuf>,
    /// When the evaluation ran.
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationReport {
    /// The flat `metrics.json` form.
    pub fn flat_metrics(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("test_rmse", self.metrics.rmse),
            ("test_mae", self.metrics.mae),
            ("test_r2", self.metrics.r2),
            ("test_mape", self.metrics.mape),
        ])
    }
}

#[derive(Serialize)]
struct ResidualRow {
    actual: f64,
    predicted: f64,
    residual: f64,
}

/// Evaluate the serving model on `test.csv` using the configured paths.
pub fn evaluate_from_config(config: &PipelineConfig) -> Result<EvaluationReport, ModelError> {
    let test = hpp_data::load_split(&config.data.processed_data_path, SplitKind::Test)?;
    let registry = ModelRegistry::new(&config.tracking.store_path);
    evaluate(&registry, &config.tracking.registered_model_name, &test, &config.evaluation)
}

/// Evaluate the serving version of `model_name` on `test`.
pub fn evaluate(
    registry: &ModelRegistry,
    model_name: &str,
    test: &Dataset,
    output: &EvaluationConfig,
) -> Result<EvaluationReport, ModelError> {
    if test.is_empty() {
        return Err(ModelError::EmptyEvaluationSet);
    }
    let version = registry.serving_version(model_name)?;
    let artifact: ModelArtifact = registry.load_artifact(&version)?;
    artifact.check_schema()?;
    tracing::info!(model = model_name, version = version.version, stage = %version.stage, rows = test.len(), "evaluating");

    let actual = test.targets();
    let predicted = artifact.predict(test.features());
    let base = RegressionMetrics::compute(actual, &predicted);
    let metrics = EvaluationMetrics {
        rmse: base.rmse,
        mae: base.mae,
        r2: base.r2,
        mape: mape(actual, &predicted),
        residuals: ResidualStats::compute(actual, &predicted),
    };
    let residuals = residuals(actual, &predicted);

    let (importance_kind, profile) = match artifact.regressor.feature_importances() {
        Some(imp) => (ImportanceKind::Impurity, imp),
        None => (ImportanceKind::AbsCoefficient, artifact.regressor.importance_profile()),
    };

    let mut outputs = Vec::new();
    outputs.push(write_residuals(&output.output_dir.join(RESIDUALS_FILE), actual, &predicted, &residuals)?);
    outputs.extend(write_plots(&output.plots_dir, actual, &predicted, &residuals, &profile)?);

    let metrics_path = output.output_dir.join(METRICS_FILE);
    outputs.push(metrics_path.clone());
    let report = EvaluationReport {
        model: EvaluatedModel {
            name: version.name.clone(),
            version: version.version,
            stage: version.stage,
            algorithm: artifact.algorithm,
            model_type: artifact.model_type().to_string(),
            params: artifact.params.clone(),
            digest: version.digest.clone(),
            trained_at: artifact.trained_at,
        },
        n_samples: test.len(),
        metrics,
        importance_kind,
        feature_importance: feature_map(&profile),
        outputs,
        evaluated_at: Utc::now(),
    };
    write_json(&metrics_path, &report.flat_metrics())?;
    write_json(&output.output_dir.join(EVALUATION_FILE), &report)?;

    tracing::info!(
        rmse = metrics.rmse,
        mae = metrics.mae,
        r2 = metrics.r2,
        mape = metrics.mape,
        "evaluation complete"
    );
    Ok(report)
}

fn write_residuals(path: &Path, actual: &[f64], predicted: &[f64], residuals: &[f64]) -> Result<PathBuf, ModelError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for ((&actual, &predicted), &residual) in actual.iter().zip(predicted).zip(residuals) {
        writer.serialize(ResidualRow {
            actual,
            predicted,
            residual,
        })?;
    }
    writer.flush().map_err(|e| ModelError::io(path, e))?;
    Ok(path.to_path_buf())
}

fn write_plots(
    dir: &Path,
    actual: &[f64],
    predicted: &[f64],
    residuals: &[f64],
    importance: &FeatureVector,
) -> Result<Vec<PathBuf>, ModelError> {
    let residual_points: Vec<(f64, f64)> = predicted.iter().copied().zip(residuals.iter().copied()).collect();
    let fit_points: Vec<(f64, f64)> = actual.iter().copied().zip(predicted.iter().copied()).collect();
    let bars: Vec<(&str, f64)> = FEATURE_NAMES.iter().copied().zip(importance.iter().copied()).collect();

    let plots = [
        (
            "residuals.svg",
            plot::scatter("Residuals vs Predicted", "Predicted value", "Residual", &residual_points, Reference::Zero),
        ),
        (
            "residual_histogram.svg",
            plot::histogram("Residual Distribution", "Residual", residuals, HISTOGRAM_BINS),
        ),
        (
            "feature_importance.svg",
            plot::bar_chart("Feature Importance", "Importance", &bars),
        ),
        (
            "predictions.svg",
            plot::scatter("Actual vs Predicted", "Actual value", "Predicted value", &fit_points, Reference::Diagonal),
        ),
    ];

    let mut written = Vec::with_capacity(plots.len());
    for (name, svg) in plots {
        let path = dir.join(name);
        write_text(&path, &svg)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regressor::Regressor;
    use hpp_core::ParamValue;
    use hpp_tracking::{NewVersion, TrackingError};

    const MODEL: &str = "housing";

    fn test_set() -> Dataset {
        let features: Vec<FeatureVector> = (0..50)
            .map(|i| {
                let t = i as f64;
                [1.0 + t % 8.0, 10.0 + t % 30.0, 5.0, 1.0, 500.0 + t, 2.5, 34.0 + t % 5.0, -118.0]
            })
            .collect();
        let targets = features.iter().map(|r| 0.5 * r[0] + 0.02 * r[1]).collect();
        Dataset::new(features, targets).unwrap()
    }

    fn register(registry: &ModelRegistry, algorithm: Algorithm, params: Hyperparameters) {
        let data = test_set();
        let regressor = Regressor::fit(algorithm, &params, data.features(), data.targets(), 0).unwrap();
        let artifact = ModelArtifact::new(algorithm, params.clone(), regressor);
        let v = registry
            .register(
                MODEL,
                &artifact,
                NewVersion {
                    run_id: None,
                    algorithm,
                    params,
                    metrics: BTreeMap::new(),
                },
            )
            .unwrap();
        registry.transition_stage(MODEL, v.version, Stage::Production).unwrap();
    }

    fn output(dir: &Path) -> EvaluationConfig {
        EvaluationConfig {
            output_dir: dir.join("reports"),
            plots_dir: dir.join("reports").join("plots"),
        }
    }

    #[test]
    fn writes_every_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("mlruns"));
        register(&registry, Algorithm::LinearRegression, Hyperparameters::new());
        let out = output(dir.path());

        let report = evaluate(&registry, MODEL, &test_set(), &out).unwrap();
        assert_eq!(report.n_samples, 50);
        assert!(report.metrics.rmse < 1e-8);
        assert_eq!(report.importance_kind, ImportanceKind::AbsCoefficient);
        assert_eq!(report.model.version, 1);

        for name in [EVALUATION_FILE, METRICS_FILE, RESIDUALS_FILE] {
            assert!(out.output_dir.join(name).exists(), "{name} missing");
        }
        for name in ["residuals.svg", "residual_histogram.svg", "feature_importance.svg", "predictions.svg"] {
            let svg = std::fs::read_to_string(out.plots_dir.join(name)).unwrap();
            assert!(svg.starts_with("<svg"), "{name}");
        }

        let flat: BTreeMap<String, f64> =
            serde_json::from_slice(&std::fs::read(out.output_dir.join(METRICS_FILE)).unwrap()).unwrap();
        assert_eq!(
            flat.keys().map(String::as_str).collect::<Vec<_>>(),
            ["test_mae", "test_mape", "test_r2", "test_rmse"]
        );

        let residuals = std::fs::read_to_string(out.output_dir.join(RESIDUALS_FILE)).unwrap();
        assert!(residuals.starts_with("actual,predicted,residual"));
        assert_eq!(residuals.lines().count(), 51);
    }

    #[test]
    fn tree_models_report_impurity_importance() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("mlruns"));
        let params = Hyperparameters::from([("max_depth".to_string(), ParamValue::Int(4))]);
        register(&registry, Algorithm::DecisionTree, params);

        let report = evaluate(&registry, MODEL, &test_set(), &output(dir.path())).unwrap();
        assert_eq!(report.importance_kind, ImportanceKind::Impurity);
        let total: f64 = report.feature_importance.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(report.feature_importance["MedInc"] > report.feature_importance["Longitude"]);
    }

    #[test]
    fn tampered_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("mlruns"));
        register(&registry, Algorithm::Ridge, Hyperparameters::new());
        let version = registry.serving_version(MODEL).unwrap();
        std::fs::write(registry.artifact_path(&version), b"{}").unwrap();

        let err = evaluate(&registry, MODEL, &test_set(), &output(dir.path())).unwrap_err();
        assert!(matches!(err, ModelError::Tracking(TrackingError::DigestMismatch { .. })));
    }

    #[test]
    fn missing_model_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("mlruns"));
        let err = evaluate(&registry, MODEL, &test_set(), &output(dir.path())).unwrap_err();
        assert!(matches!(err, ModelError::Tracking(TrackingError::ModelNotFound(_))));
    }
}
