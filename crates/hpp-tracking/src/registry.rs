//! # Model Registry
//!
//! Versioned storage for fitted models under `<store>/registry`:
//!
//! ```text
//! registry/<model>/<version>/version.json
//! registry/<model>/<version>/model.json
//! ```
//!
//! Versions count up from 1. At most one version of a model is in the
//! `Production` stage; promoting a version archives the previous one. The
//! SHA-256 digest of `model.json` is recorded at registration and checked on
//! every load.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hpp_core::{Algorithm, Hyperparameters};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TrackingError;
use crate::fsutil::{check_name, read_json, sha256_hex, write_bytes, write_json};

const VERSION_FILE: &str = "version.json";
const MODEL_FILE: &str = "model.json";

/// Deployment stage of a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Registered, not deployed.
    None,
    /// Candidate for production.
    Staging,
    /// Served by the prediction service.
    Production,
    /// Previously deployed.
    Archived,
}

impl Stage {
    /// Stage label as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Staging => "Staging",
            Self::Production => "Production",
            Self::Archived => "Archived",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown stage '{other}'")),
        }
    }
}

/// Metadata supplied when registering a model.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    /// Tracking run that produced the model.
    pub run_id: Option<String>,
    /// Estimator family.
    pub algorithm: Algorithm,
    /// Winning hyperparameters.
    pub params: Hyperparameters,
    /// Validation and test metrics.
    pub metrics: BTreeMap<String, f64>,
}

/// One registered model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Registered model name.
    pub name: String,
    /// Version number, starting at 1.
    pub version: u32,
    /// Current stage.
    pub stage: Stage,
    /// Tracking run that produced the model.
    pub run_id: Option<String>,
    /// Estimator family.
    pub algorithm: Algorithm,
    /// Winning hyperparameters.
    pub params: Hyperparameters,
    /// Metrics recorded at registration.
    pub metrics: BTreeMap<String, f64>,
    /// SHA-256 of the stored artifact.
    pub digest: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// Handle on the registry directory of a tracking store.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    root: PathBuf,
}

impl ModelRegistry {
    /// Registry rooted under the tracking store at `store_root`.
    pub fn new(store_root: impl AsRef<Path>) -> Self {
        Self {
            root: store_root.as_ref().join("registry"),
        }
    }

    fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.model_dir(name).join(version.to_string())
    }

    /// Store `artifact` as the next version of `name`, in stage `None`.
    pub fn register<T: Serialize>(
        &self,
        name: &str,
        artifact: &T,
        meta: NewVersion,
    ) -> Result<ModelVersion, TrackingError> {
        check_name(name)?;
        let model_dir = self.model_dir(name);
        fs::create_dir_all(&model_dir).map_err(|e| TrackingError::io(&model_dir, e))?;

        let bytes = serde_json::to_vec(artifact).map_err(|source| TrackingError::Serialization {
            path: model_dir.join(MODEL_FILE),
            source,
        })?;

        // create_dir fails if another registration claimed the number first
        let mut version = self.next_version(name)?;
        let dir = loop {
            let dir = self.version_dir(name, version);
            match fs::create_dir(&dir) {
                Ok(()) => break dir,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => version += 1,
                Err(e) => return Err(TrackingError::io(&dir, e)),
            }
        };

        write_bytes(&dir.join(MODEL_FILE), &bytes)?;
        let record = ModelVersion {
            name: name.to_string(),
            version,
            stage: Stage::None,
            run_id: meta.run_id,
            algorithm: meta.algorithm,
            params: meta.params,
            metrics: meta.metrics,
            digest: sha256_hex(&bytes),
            created_at: Utc::now(),
        };
        write_json(&dir.join(VERSION_FILE), &record)?;
        tracing::info!(model = name, version, algorithm = %record.algorithm, "registered model version");
        Ok(record)
    }

    fn next_version(&self, name: &str) -> Result<u32, TrackingError> {
        Ok(self.versions(name)?.last().map_or(1, |v| v.version + 1))
    }

    /// Every version of `name`, ascending. Empty when the model is unknown.
    pub fn versions(&self, name: &str) -> Result<Vec<ModelVersion>, TrackingError> {
        check_name(name)?;
        let dir = self.model_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|e| TrackingError::io(&dir, e))?;
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TrackingError::io(&dir, e))?;
            let file = entry.path().join(VERSION_FILE);
            if file.exists() {
                versions.push(read_json::<ModelVersion>(&file)?);
            }
        }
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    /// One version by number.
    pub fn get_version(&self, name: &str, version: u32) -> Result<ModelVersion, TrackingError> {
        check_name(name)?;
        let file = self.version_dir(name, version).join(VERSION_FILE);
        if !file.exists() {
            return Err(TrackingError::VersionNotFound {
                name: name.to_string(),
                version,
            });
        }
        read_json(&file)
    }

    /// Highest version of `name`, optionally restricted to `stage`.
    pub fn latest(&self, name: &str, stage: Option<Stage>) -> Result<Option<ModelVersion>, TrackingError> {
        Ok(self
            .versions(name)?
            .into_iter()
            .filter(|v| stage.map_or(true, |s| v.stage == s))
            .last())
    }

    /// The version the prediction service should load: the production
    /// version, else the newest version that is not archived.
    pub fn serving_version(&self, name: &str) -> Result<ModelVersion, TrackingError> {
        if let Some(v) = self.latest(name, Some(Stage::Production))? {
            return Ok(v);
        }
        self.versions(name)?
            .into_iter()
            .filter(|v| v.stage != Stage::Archived)
            .last()
            .ok_or_else(|| TrackingError::ModelNotFound(name.to_string()))
    }

    /// Move a version to `stage`. Promoting to `Production` archives the
    /// version that held it.
    pub fn transition_stage(
        &self,
        name: &str,
        version: u32,
        stage: Stage,
    ) -> Result<ModelVersion, TrackingError> {
        let mut target = self.get_version(name, version)?;
        if stage == Stage::Production {
            for mut other in self.versions(name)? {
                if other.version != version && other.stage == Stage::Production {
                    other.stage = Stage::Archived;
                    write_json(&self.version_dir(name, other.version).join(VERSION_FILE), &other)?;
                    tracing::info!(model = name, version = other.version, "archived previous production version");
                }
            }
        }
        target.stage = stage;
        write_json(&self.version_dir(name, version).join(VERSION_FILE), &target)?;
        tracing::info!(model = name, version, stage = %stage, "stage transition");
        Ok(target)
    }

    /// Deserialize a version's artifact after checking its digest.
    pub fn load_artifact<T: DeserializeOwned>(&self, version: &ModelVersion) -> Result<T, TrackingError> {
        let path = self.version_dir(&version.name, version.version).join(MODEL_FILE);
        let bytes = fs::read(&path).map_err(|e| TrackingError::io(&path, e))?;
        let actual = sha256_hex(&bytes);
        if actual != version.digest {
            return Err(TrackingError::DigestMismatch {
                name: version.name.clone(),
                version: version.version,
                expected: version.digest.clone(),
                actual,
            });
        }
        serde_json::from_slice(&bytes).map_err(|source| TrackingError::Serialization { path, source })
    }

    /// Path of a version's stored artifact.
    pub fn artifact_path(&self, version: &ModelVersion) -> PathBuf {
        self.version_dir(&version.name, version.version).join(MODEL_FILE)
    }
}
