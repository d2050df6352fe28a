//! # Model Routes
//!
//! - `GET  /model/info`    - Metadata of the serving model
//! - `POST /model/reload`  - Re-read the serving version from the registry
//!
//! A reload swaps the model snapshot only after the new version has loaded
//! and passed its schema check; on failure the previous model keeps serving.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use hpp_core::temporal::now_timestamp;
use hpp_model::feature_map;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

/// Assemble the model router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/model/info", get(model_info))
        .route("/model/reload", post(reload_model))
}

/// Serving model metadata.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModelInfoResponse {
    /// Registered model name.
    pub model_name: String,
    /// Registry version.
    pub model_version: String,
    /// Registry stage.
    pub stage: String,
    /// Algorithm identifier, e.g. `random_forest`.
    pub algorithm: String,
    /// Estimator type, e.g. `RandomForestRegressor`.
    pub model_type: String,
    /// Tracking run that produced the model.
    pub run_id: Option<String>,
    /// SHA-256 of the stored artifact.
    pub digest: String,
    /// When the service loaded this version.
    pub loaded_at: DateTime<Utc>,
    /// When the model was fitted.
    pub trained_at: DateTime<Utc>,
    /// When the version was registered.
    pub registered_at: DateTime<Utc>,
    /// Input columns in model order.
    pub feature_names: Vec<String>,
    /// Impurity importances, for tree models.
    pub feature_importances: Option<BTreeMap<String, f64>>,
    /// Fitted hyperparameters.
    #[schema(value_type = Object)]
    pub hyperparameters: serde_json::Value,
    /// Metrics recorded at registration.
    pub training_metrics: BTreeMap<String, f64>,
}

/// Result of a successful reload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReloadResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Registered model name.
    pub model_name: String,
    /// Version served before the reload, if any.
    pub previous_version: Option<String>,
    /// Version served now.
    pub new_version: String,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
}

/// GET /model/info - Describe the serving model.
#[utoipa::path(
    get,
    path = "/model/info",
    responses(
        (status = 200, description = "Serving model metadata", body = ModelInfoResponse),
        (status = 503, description = "No model loaded", body = ErrorBody),
    ),
    tag = "model"
)]
pub async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfoResponse>, AppError> {
    let model = state.model.current().ok_or(AppError::ModelNotReady)?;
    let artifact = &model.artifact;
    let hyperparameters =
        serde_json::to_value(&artifact.params).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ModelInfoResponse {
        model_name: model.version.name.clone(),
        model_version: model.version_label(),
        stage: model.version.stage.to_string(),
        algorithm: artifact.algorithm.as_str().to_string(),
        model_type: artifact.model_type().to_string(),
        run_id: model.version.run_id.clone(),
        digest: model.version.digest.clone(),
        loaded_at: model.loaded_at,
        trained_at: artifact.trained_at,
        registered_at: model.version.created_at,
        feature_names: artifact.feature_names.clone(),
        feature_importances: artifact.regressor.feature_importances().map(|v| feature_map(&v)),
        hyperparameters,
        training_metrics: model.version.metrics.clone(),
    }))
}

/// POST /model/reload - Load the serving version from the registry.
#[utoipa::path(
    post,
    path = "/model/reload",
    responses(
        (status = 200, description = "Model reloaded", body = ReloadResponse),
        (status = 500, description = "Reload failed; the previous model keeps serving", body = ErrorBody),
    ),
    tag = "model"
)]
pub async fn reload_model(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let (previous, current) = state
        .reload_model()
        .await
        .map_err(|e| AppError::ReloadFailed(e.to_string()))?;

    let previous_version = previous.map(|m| m.version_label());
    let new_version = current.version_label();
    tracing::info!(
        model = %current.version.name,
        previous = ?previous_version,
        version = %new_version,
        "model reloaded"
    );

    Ok(Json(ReloadResponse {
        message: format!("model '{}' v{} loaded", current.version.name, new_version),
        model_name: current.version.name.clone(),
        previous_version,
        new_version,
        timestamp: now_timestamp(),
    }))
}
