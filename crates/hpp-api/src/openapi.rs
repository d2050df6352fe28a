//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`. Title, version and description are taken from
//! the `api` configuration section when the document is served.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the prediction service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "California Housing Price Prediction API",
        version = "1.0.0",
        description = "Predicts median house values for California block groups.\n\nProvides:\n- **Single and batch predictions** with field-level validation\n- **Model management**: metadata of the serving model and hot reload from the registry\n- **Health probes** with per-component checks\n- **Monitoring**: Prometheus metrics, request and prediction aggregates, HTML dashboard",
    ),
    paths(
        // ── Service ─────────────────────────────────────────────────────
        crate::routes::root::root,
        // ── Prediction ──────────────────────────────────────────────────
        crate::routes::prediction::predict,
        crate::routes::prediction::predict_batch,
        // ── Health ──────────────────────────────────────────────────────
        crate::routes::health::health,
        crate::routes::health::health_detailed,
        // ── Model ───────────────────────────────────────────────────────
        crate::routes::model::model_info,
        crate::routes::model::reload_model,
        // ── Monitoring ──────────────────────────────────────────────────
        crate::routes::metrics::prometheus_metrics,
        crate::routes::monitoring::metrics_summary,
        crate::routes::monitoring::prediction_stats,
        crate::routes::monitoring::dashboard,
    ),
    components(
        schemas(
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Prediction DTOs ─────────────────────────────────────────
            crate::routes::prediction::HousingFeaturesInput,
            crate::routes::prediction::PredictionResponse,
            crate::routes::prediction::BatchPredictionRequest,
            crate::routes::prediction::BatchPredictionResponse,
            // ── Service, health and model DTOs ──────────────────────────
            crate::routes::root::RootResponse,
            crate::routes::health::HealthResponse,
            crate::routes::health::DetailedHealthResponse,
            crate::routes::health::HealthChecks,
            crate::routes::health::ComponentHealth,
            crate::routes::model::ModelInfoResponse,
            crate::routes::model::ReloadResponse,
            // ── Monitoring DTOs ─────────────────────────────────────────
            crate::routes::monitoring::MetricsSummary,
            crate::db::requests::RequestSummary,
            crate::db::requests::EndpointStats,
            crate::db::predictions::PredictionStats,
            crate::db::predictions::VersionStats,
        )
    ),
    tags(
        (name = "service", description = "Service description"),
        (name = "prediction", description = "Median house value predictions"),
        (name = "health", description = "Liveness and component checks"),
        (name = "model", description = "Serving model metadata and reload"),
        (name = "monitoring", description = "Metrics, log aggregates and dashboard"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json - The document, labelled with the configured service info.
async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    let mut doc = ApiDoc::openapi();
    let api = &state.config.api;
    doc.info.title = api.title.clone();
    doc.info.version = api.version.clone();
    doc.info.description = Some(api.description.clone());
    Json(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_spec_lists_every_endpoint() {
        let spec = ApiDoc::openapi();
        for path in [
            "/",
            "/predict",
            "/predict/batch",
            "/health",
            "/health/detailed",
            "/model/info",
            "/model/reload",
            "/metrics",
            "/monitoring/metrics/summary",
            "/monitoring/predictions/stats",
            "/monitoring/dashboard",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn openapi_spec_has_request_schema() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.schemas.contains_key("HousingFeaturesInput"));
        assert!(components.schemas.contains_key("ErrorBody"));
    }

    #[test]
    fn openapi_spec_serializes_to_json() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("openapi"));
        assert!(json.contains("MedInc"));
    }
}
