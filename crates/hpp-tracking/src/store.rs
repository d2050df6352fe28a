//! # Experiment Tracking Store
//!
//! Layout under the store root:
//!
//! ```text
//! experiments/<experiment>/experiment.json
//! experiments/<experiment>/runs/<run_id>/run.json
//! experiments/<experiment>/runs/<run_id>/artifacts/<name>
//! ```
//!
//! `run.json` is rewritten after every logging call, so a crashed training
//! process leaves a run in `RUNNING` state with everything logged so far.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hpp_core::Hyperparameters;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TrackingError;
use crate::fsutil::{check_name, read_json, write_bytes, write_json};

const EXPERIMENT_FILE: &str = "experiment.json";
const RUN_FILE: &str = "run.json";

/// A named group of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Stable identifier assigned at creation.
    pub experiment_id: String,
    /// Name, also the directory name.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Still logging.
    Running,
    /// Ended normally.
    Finished,
    /// Ended with an error.
    Failed,
}

/// Everything recorded about one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Unique run identifier.
    pub run_id: String,
    /// Human-readable name, e.g. the algorithm.
    pub run_name: String,
    /// Owning experiment's identifier.
    pub experiment_id: String,
    /// Current status.
    pub status: RunStatus,
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run ended, if it has.
    pub end_time: Option<DateTime<Utc>>,
    /// Logged parameters, stringified.
    pub params: BTreeMap<String, String>,
    /// Logged metrics; re-logging a key overwrites it.
    pub metrics: BTreeMap<String, f64>,
    /// Free-form tags.
    pub tags: BTreeMap<String, String>,
    /// Names of logged artifacts, relative to the artifact directory.
    pub artifacts: Vec<String>,
}

/// Root handle on a tracking store directory.
#[derive(Debug, Clone)]
pub struct TrackingStore {
    root: PathBuf,
}

impl TrackingStore {
    /// Open (creating if needed) the store at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, TrackingError> {
        let root = root.into();
        let experiments = root.join("experiments");
        fs::create_dir_all(&experiments).map_err(|e| TrackingError::io(&experiments, e))?;
        Ok(Self { root })
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn experiment_dir(&self, name: &str) -> PathBuf {
        self.root.join("experiments").join(name)
    }

    /// Fetch the experiment called `name`, creating it on first use.
    pub fn get_or_create_experiment(&self, name: &str) -> Result<Experiment, TrackingError> {
        check_name(name)?;
        let path = self.experiment_dir(name).join(EXPERIMENT_FILE);
        if path.exists() {
            return read_json(&path);
        }
        let experiment = Experiment {
            experiment_id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        write_json(&path, &experiment)?;
        tracing::info!(experiment = name, id = %experiment.experiment_id, "created experiment");
        Ok(experiment)
    }

    /// Begin a new run in `experiment`.
    pub fn start_run(&self, experiment: &Experiment, run_name: &str) -> Result<ActiveRun, TrackingError> {
        let run_id = Uuid::new_v4().simple().to_string();
        let dir = self.experiment_dir(&experiment.name).join("runs").join(&run_id);
        let info = RunInfo {
            run_id,
            run_name: run_name.to_string(),
            experiment_id: experiment.experiment_id.clone(),
            status: RunStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            tags: BTreeMap::new(),
            artifacts: Vec::new(),
        };
        let run = ActiveRun { dir, info };
        run.persist()?;
        tracing::debug!(run_id = %run.info.run_id, run_name, "run started");
        Ok(run)
    }

    /// All runs of `experiment`, oldest first.
    pub fn list_runs(&self, experiment: &Experiment) -> Result<Vec<RunInfo>, TrackingError> {
        let runs_dir = self.experiment_dir(&experiment.name).join("runs");
        if !runs_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&runs_dir).map_err(|e| TrackingError::io(&runs_dir, e))?;
        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TrackingError::io(&runs_dir, e))?;
            let file = entry.path().join(RUN_FILE);
            if file.exists() {
                runs.push(read_json::<RunInfo>(&file)?);
            }
        }
        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(runs)
    }

    /// One run by id.
    pub fn get_run(&self, experiment: &Experiment, run_id: &str) -> Result<RunInfo, TrackingError> {
        check_name(run_id)?;
        let file = self
            .experiment_dir(&experiment.name)
            .join("runs")
            .join(run_id)
            .join(RUN_FILE);
        if !file.exists() {
            return Err(TrackingError::RunNotFound {
                experiment: experiment.name.clone(),
                run_id: run_id.to_string(),
            });
        }
        read_json(&file)
    }

    /// Path of an artifact logged by a run.
    pub fn artifact_path(&self, experiment: &Experiment, run_id: &str, name: &str) -> PathBuf {
        self.experiment_dir(&experiment.name)
            .join("runs")
            .join(run_id)
            .join("artifacts")
            .join(name)
    }
}

/// A run that is still accepting parameters, metrics and artifacts.
///
/// Consumed by [`ActiveRun::finish`] or [`ActiveRun::fail`]; a run dropped
/// without either stays `RUNNING` on disk.
#[derive(Debug)]
pub struct ActiveRun {
    dir: PathBuf,
    info: RunInfo,
}

impl ActiveRun {
    /// The run's identifier.
    pub fn run_id(&self) -> &str {
        &self.info.run_id
    }

    /// Snapshot of what has been logged so far.
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    fn persist(&self) -> Result<(), TrackingError> {
        write_json(&self.dir.join(RUN_FILE), &self.info)
    }

    /// Record one parameter.
    pub fn log_param(&mut self, key: &str, value: impl ToString) -> Result<(), TrackingError> {
        self.info.params.insert(key.to_string(), value.to_string());
        self.persist()
    }

    /// Record a full hyperparameter assignment.
    pub fn log_params(&mut self, params: &Hyperparameters) -> Result<(), TrackingError> {
        for (k, v) in params {
            self.info.params.insert(k.clone(), v.to_string());
        }
        self.persist()
    }

    /// Record one metric.
    pub fn log_metric(&mut self, key: &str, value: f64) -> Result<(), TrackingError> {
        self.info.metrics.insert(key.to_string(), value);
        self.persist()
    }

    /// Record several metrics at once.
    pub fn log_metrics<'a>(
        &mut self,
        metrics: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<(), TrackingError> {
        for (k, v) in metrics {
            self.info.metrics.insert(k.to_string(), v);
        }
        self.persist()
    }

    /// Attach a tag.
    pub fn set_tag(&mut self, key: &str, value: impl ToString) -> Result<(), TrackingError> {
        self.info.tags.insert(key.to_string(), value.to_string());
        self.persist()
    }

    /// Store raw bytes as an artifact named `name`.
    pub fn log_artifact(&mut self, name: &str, bytes: &[u8]) -> Result<PathBuf, TrackingError> {
        check_name(name)?;
        let path = self.dir.join("artifacts").join(name);
        write_bytes(&path, bytes)?;
        if !self.info.artifacts.iter().any(|a| a == name) {
            self.info.artifacts.push(name.to_string());
        }
        self.persist()?;
        Ok(path)
    }

    /// Store `value` as a JSON artifact named `name`.
    pub fn log_json_artifact<T: Serialize>(&mut self, name: &str, value: &T) -> Result<PathBuf, TrackingError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| TrackingError::Serialization {
            path: self.dir.join("artifacts").join(name),
            source,
        })?;
        self.log_artifact(name, &bytes)
    }

    /// End the run successfully.
    pub fn finish(self) -> Result<RunInfo, TrackingError> {
        self.end(RunStatus::Finished, None)
    }

    /// End the run as failed, recording `reason` as the `error` tag.
    pub fn fail(self, reason: &str) -> Result<RunInfo, TrackingError> {
        self.end(RunStatus::Failed, Some(reason))
    }

    fn end(mut self, status: RunStatus, reason: Option<&str>) -> Result<RunInfo, TrackingError> {
        self.info.status = status;
        self.info.end_time = Some(Utc::now());
        if let Some(reason) = reason {
            self.info.tags.insert("error".to_string(), reason.to_string());
        }
        self.persist()?;
        Ok(self.info)
    }
}
