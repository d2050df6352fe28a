//! # Prediction Routes
//!
//! - `POST /predict`        - Predict the median house value of one block group
//! - `POST /predict/batch`  - Predict up to `api.max_batch_size` block groups
//!
//! Bodies are parsed as untyped JSON and validated through
//! `HousingFeatures::from_json`, so a rejected record names the offending
//! field (`instances[3].HouseAge` inside a batch) and the violated range.
//! A batch is all-or-nothing on validation: one invalid item rejects the
//! request before any prediction is made.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use hpp_core::temporal::format_timestamp;
use hpp_core::{HousingFeatures, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::predictions::{self, PredictionRecord};
use crate::error::{AppError, ErrorBody};
use crate::extractors::extract_json;
use crate::middleware::metrics::PredictionKind;
use crate::state::{AppState, ServingModel};

/// Longest accepted `batch_name`, in characters.
pub const MAX_BATCH_NAME_LEN: usize = 100;

/// Assemble the prediction router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
}

// ---------------------------------------------------------------------------
// Request and response types
// ---------------------------------------------------------------------------

/// Block group covariates. Every field is required; ranges are inclusive.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "MedInc": 8.3252, "HouseAge": 41.0, "AveRooms": 6.984127, "AveBedrms": 1.02381,
    "Population": 322.0, "AveOccup": 2.555556, "Latitude": 37.88, "Longitude": -122.23
}))]
pub struct HousingFeaturesInput {
    /// Median income in the block group, tens of thousands of dollars (0 to 20).
    #[serde(rename = "MedInc")]
    pub med_inc: f64,
    /// Median house age in years (0 to 100).
    #[serde(rename = "HouseAge")]
    pub house_age: f64,
    /// Average rooms per household (1 to 50).
    #[serde(rename = "AveRooms")]
    pub ave_rooms: f64,
    /// Average bedrooms per household (0 to 10).
    #[serde(rename = "AveBedrms")]
    pub ave_bedrms: f64,
    /// Block group population (1 to 50000).
    #[serde(rename = "Population")]
    pub population: f64,
    /// Average household members (1 to 20).
    #[serde(rename = "AveOccup")]
    pub ave_occup: f64,
    /// Latitude in degrees (32 to 42).
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    /// Longitude in degrees (-125 to -114).
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

/// One prediction.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PredictionResponse {
    /// Predicted median house value in units of $100,000.
    pub prediction: f64,
    /// UUID for single predictions, `{batch_id}_{index}` for batch items.
    pub prediction_id: String,
    /// Registry version that produced the prediction.
    pub model_version: String,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// The validated input.
    #[schema(value_type = HousingFeaturesInput)]
    pub input_features: HousingFeatures,
    /// Time spent in the model, in milliseconds.
    pub processing_time_ms: f64,
}

/// Batch prediction request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchPredictionRequest {
    /// Records to predict, 1 to `api.max_batch_size` (default 100).
    #[schema(value_type = Vec<HousingFeaturesInput>)]
    pub instances: Vec<Value>,
    /// Optional caller label, at most 100 characters.
    #[serde(default)]
    pub batch_name: Option<String>,
}

/// Batch prediction response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchPredictionResponse {
    /// Per-item predictions in request order.
    pub predictions: Vec<PredictionResponse>,
    /// UUID of this batch.
    pub batch_id: String,
    /// Echo of the request's `batch_name`.
    pub batch_name: Option<String>,
    /// Items in the request.
    pub total_instances: usize,
    /// Items with a prediction.
    pub successful_predictions: usize,
    /// Items for which the model produced no finite value.
    pub failed_predictions: usize,
    /// Wall time for the whole batch.
    pub processing_time_seconds: f64,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /predict - Predict one record.
#[utoipa::path(
    post,
    path = "/predict",
    request_body = HousingFeaturesInput,
    responses(
        (status = 200, description = "Prediction", body = PredictionResponse),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 422, description = "A field failed validation", body = ErrorBody),
        (status = 503, description = "No model loaded", body = ErrorBody),
    ),
    tag = "prediction"
)]
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let value = extract_json(body)?;
    let features = HousingFeatures::from_json(&value)?;
    warn_implausible(&features, None);
    let model = state.model.current().ok_or(AppError::ModelNotReady)?;

    let started = Instant::now();
    let prediction = model.predict(&features);
    let inference = started.elapsed().as_secs_f64();

    if !prediction.is_finite() {
        return Err(AppError::Internal(format!(
            "model v{} produced non-finite prediction {prediction}",
            model.version.version
        )));
    }

    let response = PredictionResponse {
        prediction,
        prediction_id: Uuid::new_v4().to_string(),
        model_version: model.version_label(),
        timestamp: format_timestamp(Utc::now()),
        input_features: features,
        processing_time_ms: inference * 1000.0,
    };

    if let Some(metrics) = &state.metrics {
        metrics.record_predictions(&response.model_version, PredictionKind::Single, &[prediction], inference);
    }
    log_predictions(&state, &model, PredictionKind::Single, std::slice::from_ref(&response)).await;

    tracing::debug!(
        prediction_id = %response.prediction_id,
        model_version = %response.model_version,
        prediction,
        "prediction served"
    );
    Ok(Json(response))
}

/// POST /predict/batch - Predict many records.
#[utoipa::path(
    post,
    path = "/predict/batch",
    request_body = BatchPredictionRequest,
    responses(
        (status = 200, description = "Batch predictions", body = BatchPredictionResponse),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 422, description = "Empty or oversized batch, or an invalid item", body = ErrorBody),
        (status = 503, description = "No model loaded", body = ErrorBody),
    ),
    tag = "prediction"
)]
pub async fn predict_batch(
    State(state): State<AppState>,
    body: Result<Json<BatchPredictionRequest>, JsonRejection>,
) -> Result<Json<BatchPredictionResponse>, AppError> {
    let started = Instant::now();
    let request = extract_json(body)?;
    let features = validate_batch(&request, state.config.api.max_batch_size)?;
    let model = state.model.current().ok_or(AppError::ModelNotReady)?;

    let batch_id = Uuid::new_v4().to_string();
    let model_version = model.version_label();
    let mut predictions = Vec::with_capacity(features.len());
    let mut failed = 0usize;
    let mut inference_total = 0.0;

    for (index, item) in features.into_iter().enumerate() {
        let item_started = Instant::now();
        let prediction = model.predict(&item);
        let inference = item_started.elapsed().as_secs_f64();
        inference_total += inference;

        if !prediction.is_finite() {
            tracing::warn!(batch_id = %batch_id, index, "model produced a non-finite prediction");
            failed += 1;
            continue;
        }
        predictions.push(PredictionResponse {
            prediction,
            prediction_id: format!("{batch_id}_{index}"),
            model_version: model_version.clone(),
            timestamp: format_timestamp(Utc::now()),
            input_features: item,
            processing_time_ms: inference * 1000.0,
        });
    }

    if let Some(metrics) = &state.metrics {
        let values: Vec<f64> = predictions.iter().map(|p| p.prediction).collect();
        metrics.record_predictions(&model_version, PredictionKind::Batch, &values, inference_total);
    }
    log_predictions(&state, &model, PredictionKind::Batch, &predictions).await;

    let response = BatchPredictionResponse {
        total_instances: request.instances.len(),
        successful_predictions: predictions.len(),
        failed_predictions: failed,
        predictions,
        batch_id,
        batch_name: request.batch_name,
        processing_time_seconds: started.elapsed().as_secs_f64(),
        timestamp: format_timestamp(Utc::now()),
    };
    tracing::info!(
        batch_id = %response.batch_id,
        total = response.total_instances,
        failed = response.failed_predictions,
        "batch prediction served"
    );
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Check batch bounds and every item, reporting the first violation.
fn validate_batch(request: &BatchPredictionRequest, max_batch_size: usize) -> Result<Vec<HousingFeatures>, ValidationError> {
    let n = request.instances.len();
    if n == 0 {
        return Err(ValidationError::new("instances", "at least 1 instance required").with_value(n));
    }
    if n > max_batch_size {
        return Err(
            ValidationError::new("instances", format!("at most {max_batch_size} instances allowed")).with_value(n),
        );
    }
    if let Some(name) = &request.batch_name {
        if name.chars().count() > MAX_BATCH_NAME_LEN {
            return Err(ValidationError::new(
                "batch_name",
                format!("at most {MAX_BATCH_NAME_LEN} characters"),
            ));
        }
    }

    request
        .instances
        .iter()
        .enumerate()
        .map(|(i, item)| -> Result<HousingFeatures, ValidationError> {
            let features = HousingFeatures::from_json(item).map_err(|e| e.within(&format!("instances[{i}]")))?;
            warn_implausible(&features, Some(i));
            Ok(features)
        })
        .collect()
}

/// Log in-range records whose fields contradict each other; they are still served.
fn warn_implausible(features: &HousingFeatures, index: Option<usize>) {
    for note in features.consistency_warnings() {
        tracing::warn!(
            field = %note.field,
            value = ?note.value,
            instance = ?index,
            "{}",
            note.constraint
        );
    }
}

/// Append served predictions to the log. Failures are logged, not returned.
async fn log_predictions(
    state: &AppState,
    model: &ServingModel,
    source: PredictionKind,
    served: &[PredictionResponse],
) {
    let Some(pool) = &state.db_pool else {
        return;
    };
    if served.is_empty() {
        return;
    }
    let records: Vec<PredictionRecord> = served
        .iter()
        .map(|p| PredictionRecord {
            id: p.prediction_id.clone(),
            timestamp: Utc::now(),
            model_version: model.version_label(),
            input_features: serde_json::to_value(p.input_features).unwrap_or_default(),
            prediction: p.prediction,
            latency_ms: p.processing_time_ms,
            source,
        })
        .collect();
    if let Err(e) = predictions::insert_many(pool, &records).await {
        tracing::warn!(error = %e, count = records.len(), "failed to log predictions");
    }
}
