//! # Application State
//!
//! Shared state for the Axum application: configuration, the serving model
//! slot, the optional SQLite pool and the optional metrics recorder.
//!
//! The model is held as an `Arc<ServingModel>` snapshot behind a
//! `parking_lot::RwLock`. Handlers clone the `Arc` and release the lock
//! before predicting, so a reload that swaps the slot never waits on
//! inference and in-flight requests finish on the model they started with.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use hpp_core::{HousingFeatures, PipelineConfig};
use hpp_model::{ModelArtifact, ModelError};
use hpp_tracking::{ModelRegistry, ModelVersion};
use metrics_exporter_prometheus::BuildError;
use parking_lot::RwLock;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::middleware::metrics::ApiMetrics;

/// Failure swapping in a new serving model.
#[derive(Error, Debug)]
pub enum ReloadError {
    /// The registry could not produce a usable model.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The blocking load task did not complete.
    #[error("model load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A loaded model together with its registry record.
#[derive(Debug)]
pub struct ServingModel {
    /// The deserialized artifact.
    pub artifact: ModelArtifact,
    /// Registry metadata for the loaded version.
    pub version: ModelVersion,
    /// When this snapshot was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl ServingModel {
    /// Wrap a freshly loaded artifact.
    pub fn new(artifact: ModelArtifact, version: ModelVersion) -> Self {
        Self {
            artifact,
            version,
            loaded_at: Utc::now(),
        }
    }

    /// Version label reported to clients and used as a metric label.
    pub fn version_label(&self) -> String {
        self.version.version.to_string()
    }

    /// Predict one validated record.
    pub fn predict(&self, features: &HousingFeatures) -> f64 {
        self.artifact.predict_one(&features.to_vector())
    }
}

/// Source of serving models.
///
/// Loading is blocking file IO and runs on the blocking pool.
pub trait ModelLoader: Send + Sync {
    /// Load the version that should be served.
    fn load(&self) -> Result<ServingModel, ModelError>;

    /// Describe the backing store for `/health/detailed`.
    fn check_store(&self) -> Result<String, String>;
}

/// Loads the serving version of a registered model.
#[derive(Debug, Clone)]
pub struct RegistryLoader {
    store_root: PathBuf,
    registry: ModelRegistry,
    model_name: String,
}

impl RegistryLoader {
    /// Loader for `model_name` in the store at `store_root`.
    pub fn new(store_root: impl Into<PathBuf>, model_name: impl Into<String>) -> Self {
        let store_root = store_root.into();
        Self {
            registry: ModelRegistry::new(&store_root),
            store_root,
            model_name: model_name.into(),
        }
    }
}

impl ModelLoader for RegistryLoader {
    fn load(&self) -> Result<ServingModel, ModelError> {
        let version = self.registry.serving_version(&self.model_name)?;
        let artifact: ModelArtifact = self.registry.load_artifact(&version)?;
        artifact.check_schema()?;
        Ok(ServingModel::new(artifact, version))
    }

    fn check_store(&self) -> Result<String, String> {
        if !self.store_root.is_dir() {
            return Err(format!("store directory {} does not exist", self.store_root.display()));
        }
        match self.registry.versions(&self.model_name) {
            Ok(versions) => Ok(format!(
                "{} registered version(s) of '{}'",
                versions.len(),
                self.model_name
            )),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Atomically swappable handle to the serving model.
#[derive(Debug, Clone, Default)]
pub struct ModelSlot(Arc<RwLock<Option<Arc<ServingModel>>>>);

impl ModelSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current model, if any.
    pub fn current(&self) -> Option<Arc<ServingModel>> {
        self.0.read().clone()
    }

    /// Install `model`, returning the snapshot it replaced.
    pub fn replace(&self, model: Arc<ServingModel>) -> Option<Arc<ServingModel>> {
        self.0.write().replace(model)
    }

    /// Whether a model is loaded.
    pub fn is_loaded(&self) -> bool {
        self.0.read().is_some()
    }
}

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline configuration.
    pub config: Arc<PipelineConfig>,
    /// The serving model.
    pub model: ModelSlot,
    /// Where models come from.
    pub loader: Arc<dyn ModelLoader>,
    /// Request and prediction log; `None` when the database is unavailable.
    pub db_pool: Option<SqlitePool>,
    /// Prometheus recorder; `None` when metrics are disabled.
    pub metrics: Option<ApiMetrics>,
    started: Instant,
    reload_lock: Arc<tokio::sync::Mutex<()>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("model_loaded", &self.model.is_loaded())
            .field("db_pool", &self.db_pool.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// Build state from configuration. No model is loaded yet.
    pub fn new(
        config: PipelineConfig,
        loader: Arc<dyn ModelLoader>,
        db_pool: Option<SqlitePool>,
    ) -> Result<Self, BuildError> {
        let metrics = if config.monitoring.metrics_enabled {
            Some(ApiMetrics::new()?)
        } else {
            None
        };
        Ok(Self {
            config: Arc::new(config),
            model: ModelSlot::new(),
            loader,
            db_pool,
            metrics,
            started: Instant::now(),
            reload_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// State backed by the registry named in the configuration.
    pub fn from_config(config: PipelineConfig, db_pool: Option<SqlitePool>) -> Result<Self, BuildError> {
        let loader = RegistryLoader::new(
            &config.tracking.store_path,
            &config.tracking.registered_model_name,
        );
        Self::new(config, Arc::new(loader), db_pool)
    }

    /// Seconds since the state was created.
    pub fn uptime_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Load the serving model into the slot.
    ///
    /// Concurrent reloads are serialized; the slot is only replaced when the
    /// load succeeds. Returns the previous and the new snapshot.
    pub async fn reload_model(
        &self,
    ) -> Result<(Option<Arc<ServingModel>>, Arc<ServingModel>), ReloadError> {
        let _guard = self.reload_lock.lock().await;
        let loader = Arc::clone(&self.loader);
        let outcome = match tokio::task::spawn_blocking(move || loader.load()).await {
            Ok(Ok(model)) => {
                let model = Arc::new(model);
                let previous = self.model.replace(Arc::clone(&model));
                Ok((previous, model))
            }
            Ok(Err(e)) => Err(ReloadError::from(e)),
            Err(join) => Err(ReloadError::from(join)),
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_reload(outcome.is_ok());
            metrics.set_model_loaded(self.model.is_loaded());
        }
        outcome
    }

    /// Startup load. A failure is logged and the service runs without a model.
    pub async fn load_initial_model(&self) {
        match self.reload_model().await {
            Ok((_, model)) => tracing::info!(
                model = %model.version.name,
                version = model.version.version,
                stage = %model.version.stage,
                algorithm = %model.artifact.algorithm,
                "model loaded"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                "no model loaded at startup; predictions return 503 until POST /model/reload succeeds"
            ),
        }
    }
}
