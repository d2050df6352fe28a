//! # Pipeline Configuration
//!
//! One YAML document drives every stage: the loader reads `data`, the
//! trainer reads `training` and `tracking`, the evaluator reads `evaluation`,
//! and the prediction service reads `api`, `monitoring` and `logging`.
//! Every section has defaults, so a partial file (or none at all) yields a
//! runnable configuration.
//!
//! The service additionally honours a handful of environment overrides, see
//! [`PipelineConfig::apply_overrides`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::error::ConfigError;
use crate::params::{ParamGrid, ParamValue};

/// Root of the YAML configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dataset acquisition and splitting.
    pub data: DataConfig,
    /// Hyperparameter search.
    pub training: TrainingConfig,
    /// Tracking store and model registry.
    pub tracking: TrackingConfig,
    /// Offline evaluation outputs.
    pub evaluation: EvaluationConfig,
    /// Prediction service.
    pub api: ApiConfig,
    /// Request log and metrics.
    pub monitoring: MonitoringConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Dataset acquisition and splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `california_housing_raw.csv` and `dataset_info.txt`.
    pub raw_data_path: PathBuf,
    /// Directory receiving `train.csv`, `validation.csv` and `test.csv`.
    pub processed_data_path: PathBuf,
    /// Census CSV fetched when the raw file is absent.
    pub source_url: String,
    /// Fraction of all rows held out for test.
    pub test_size: f64,
    /// Fraction of the non-test rows held out for validation.
    pub validation_size: f64,
    /// Seed of the split shuffle.
    pub random_state: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_data_path: PathBuf::from("data/raw"),
            processed_data_path: PathBuf::from("data/processed"),
            source_url: "https://raw.githubusercontent.com/ageron/handson-ml2/master/datasets/housing/housing.csv"
                .to_string(),
            test_size: 0.2,
            validation_size: 0.2,
            random_state: 42,
        }
    }
}

/// How candidates are drawn from a parameter grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Evaluate every combination.
    #[default]
    Grid,
    /// Evaluate `n_iter` distinct combinations drawn with the training seed.
    Random {
        /// Number of candidates to draw.
        n_iter: usize,
    },
}

/// Search settings for one algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    /// Estimator family.
    #[serde(rename = "name")]
    pub algorithm: Algorithm,
    /// Fold count for this algorithm; falls back to [`TrainingConfig::cv_folds`].
    #[serde(default)]
    pub cv_folds: Option<usize>,
    /// Candidate selection.
    #[serde(default)]
    pub search: SearchStrategy,
    /// Candidate values per parameter.
    #[serde(default)]
    pub param_grid: ParamGrid,
}

impl AlgorithmConfig {
    fn with_grid(algorithm: Algorithm, grid: &[(&str, Vec<ParamValue>)]) -> Self {
        Self {
            algorithm,
            cv_folds: None,
            search: SearchStrategy::Grid,
            param_grid: grid
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        }
    }
}

/// Hyperparameter search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Default number of cross-validation folds.
    pub cv_folds: usize,
    /// Seed for randomized search and tree bootstrap sampling.
    pub random_state: u64,
    /// Where the comparison of all algorithms is written.
    pub metrics_path: PathBuf,
    /// Algorithms to search, in order.
    pub algorithms: Vec<AlgorithmConfig>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        use ParamValue::{Bool, Float, Int, None as Unbounded};

        Self {
            cv_folds: 5,
            random_state: 42,
            metrics_path: PathBuf::from("reports/training_metrics.json"),
            algorithms: vec![
                AlgorithmConfig::with_grid(
                    Algorithm::LinearRegression,
                    &[("fit_intercept", vec![Bool(true), Bool(false)])],
                ),
                AlgorithmConfig::with_grid(
                    Algorithm::Ridge,
                    &[
                        (
                            "alpha",
                            vec![Float(0.1), Float(1.0), Float(10.0), Float(100.0), Float(1000.0)],
                        ),
                        ("fit_intercept", vec![Bool(true)]),
                    ],
                ),
                AlgorithmConfig::with_grid(
                    Algorithm::Lasso,
                    &[
                        ("alpha", vec![Float(0.001), Float(0.01), Float(0.1), Float(1.0)]),
                        ("max_iter", vec![Int(1000), Int(5000)]),
                        ("tol", vec![Float(0.0001)]),
                    ],
                ),
                AlgorithmConfig::with_grid(
                    Algorithm::DecisionTree,
                    &[
                        ("max_depth", vec![Int(5), Int(10), Int(15), Int(20), Unbounded]),
                        ("min_samples_split", vec![Int(2), Int(5), Int(10), Int(20)]),
                        ("min_samples_leaf", vec![Int(1), Int(2), Int(5), Int(10)]),
                    ],
                ),
                AlgorithmConfig {
                    cv_folds: Some(3),
                    search: SearchStrategy::Random { n_iter: 6 },
                    ..AlgorithmConfig::with_grid(
                        Algorithm::RandomForest,
                        &[
                            ("n_estimators", vec![Int(50), Int(100), Int(200)]),
                            ("max_depth", vec![Int(10), Int(20), Int(30), Unbounded]),
                            ("min_samples_split", vec![Int(2), Int(5), Int(10)]),
                            ("min_samples_leaf", vec![Int(1), Int(2), Int(4)]),
                            ("max_features", vec![Float(1.0), Float(0.5)]),
                        ],
                    )
                },
            ],
        }
    }
}

/// Tracking store and model registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Root directory of the store.
    pub store_path: PathBuf,
    /// Experiment that training runs are grouped under.
    pub experiment_name: String,
    /// Registry name the best model is registered as.
    pub registered_model_name: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("mlruns"),
            experiment_name: "california_housing".to_string(),
            registered_model_name: "california_housing_model".to_string(),
        }
    }
}

/// Offline evaluation outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Directory receiving the metrics files and `residuals.csv`.
    pub output_dir: PathBuf,
    /// Directory receiving the SVG plots.
    pub plots_dir: PathBuf,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            plots_dir: PathBuf::from("reports/plots"),
        }
    }
}

/// Prediction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Service title for the root endpoint and OpenAPI document.
    pub title: String,
    /// One-line service description.
    pub description: String,
    /// Service version string.
    pub version: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Upper bound on `instances` in a batch request.
    pub max_batch_size: usize,
    /// Allowed CORS origins; `*` allows any.
    pub cors_allow_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: "California Housing Price Prediction API".to_string(),
            description: "Predicts median house values for California block groups".to_string(),
            version: "1.0.0".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_batch_size: 100,
            cors_allow_origins: vec!["*".to_string()],
        }
    }
}

/// Request log and metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// SQLite file holding the prediction and request logs.
    pub database_path: PathBuf,
    /// Full sqlx URL; takes precedence over `database_path` when set.
    pub database_url: Option<String>,
    /// Whether Prometheus metrics are recorded.
    pub metrics_enabled: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/predictions.db"),
            database_url: None,
            metrics_enabled: true,
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl PipelineConfig {
    /// Read, parse and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no stage could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("data.test_size", self.data.test_size),
            ("data.validation_size", self.data.validation_size),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in (0, 1), got {value}"
                )));
            }
        }
        if self.training.algorithms.is_empty() {
            return Err(ConfigError::Invalid(
                "training.algorithms must list at least one algorithm".to_string(),
            ));
        }
        let folds = std::iter::once(self.training.cv_folds)
            .chain(self.training.algorithms.iter().filter_map(|a| a.cv_folds));
        for k in folds {
            if k < 2 {
                return Err(ConfigError::Invalid(format!(
                    "cross-validation needs at least 2 folds, got {k}"
                )));
            }
        }
        if self.api.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "api.max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply service overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply service overrides from `lookup`.
    ///
    /// - `PORT` replaces `api.port` when it parses.
    /// - `DATABASE_URL` sets `monitoring.database_url`.
    /// - `HPP_METRICS_ENABLED` (`true`/`false`/`1`/`0`) sets
    ///   `monitoring.metrics_enabled`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse().ok()) {
            self.api.port = port;
        }
        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()) {
            self.monitoring.database_url = Some(url);
        }
        if let Some(flag) = lookup("HPP_METRICS_ENABLED") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => self.monitoring.metrics_enabled = true,
                "false" | "0" => self.monitoring.metrics_enabled = false,
                _ => {}
            }
        }
    }

    /// Search settings for `algorithm`, if it is configured.
    pub fn algorithm(&self, algorithm: Algorithm) -> Option<&AlgorithmConfig> {
        self.training
            .algorithms
            .iter()
            .find(|a| a.algorithm == algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.api.max_batch_size, 100);
        assert_eq!(config.data.random_state, 42);
        assert_eq!(config.training.algorithms.len(), 5);
    }

    #[test]
    fn default_algorithms_match_shipped_config() {
        let text = include_str!("../../../configs/config.yaml");
        let shipped: PipelineConfig = serde_yaml::from_str(text).unwrap();
        let defaults = TrainingConfig::default();
        let names = |c: &TrainingConfig| c.algorithms.iter().map(|a| a.algorithm).collect::<Vec<_>>();
        assert_eq!(names(&defaults), names(&shipped.training));
        assert_eq!(defaults.algorithms, shipped.training.algorithms);
    }

    #[test]
    fn shipped_config_is_valid() {
        let text = include_str!("../../../configs/config.yaml");
        let config: PipelineConfig = serde_yaml::from_str(text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.training.algorithms.len(), 5);
        assert_eq!(config.api.version, "1.0.0");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config: PipelineConfig = serde_yaml::from_str("api:\n  port: 9100\n").unwrap();
        assert_eq!(config.api.port, 9100);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.tracking.experiment_name, "california_housing");
    }

    #[test]
    fn algorithm_list_parses() {
        let yaml = r#"
training:
  cv_folds: 4
  algorithms:
    - name: ridge
      param_grid:
        alpha: [0.5, 5.0]
    - name: random_forest
      cv_folds: 3
      search:
        strategy: random
        n_iter: 2
      param_grid:
        n_estimators: [10]
        max_depth: [null, 8]
"#;
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        let rf = config.algorithm(Algorithm::RandomForest).unwrap();
        assert_eq!(rf.search, SearchStrategy::Random { n_iter: 2 });
        assert_eq!(rf.param_grid["max_depth"][0], ParamValue::None);
        assert_eq!(config.algorithm(Algorithm::Ridge).unwrap().search, SearchStrategy::Grid);
        assert!(config.algorithm(Algorithm::Lasso).is_none());
    }

    #[test]
    fn rejects_bad_split_fraction() {
        let mut config = PipelineConfig::default();
        config.data.test_size = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("data.test_size"));
    }

    #[test]
    fn rejects_single_fold() {
        let mut config = PipelineConfig::default();
        config.training.algorithms[0].cv_folds = Some(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_algorithm_list() {
        let mut config = PipelineConfig::default();
        config.training.algorithms.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("PORT", "8081"),
            ("DATABASE_URL", "sqlite://override.db"),
            ("HPP_METRICS_ENABLED", "false"),
        ]
        .into_iter()
        .collect();
        let mut config = PipelineConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api.port, 8081);
        assert_eq!(config.monitoring.database_url.as_deref(), Some("sqlite://override.db"));
        assert!(!config.monitoring.metrics_enabled);
    }

    #[test]
    fn unparseable_port_is_ignored() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(|k| (k == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.api.port, 8000);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "api: [unclosed").unwrap();
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
