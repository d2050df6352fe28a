//! # Root Route
//!
//! - `GET /` - Service name, version and links to the other endpoints

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// Assemble the root router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(root))
}

/// Service description and links.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    /// Service title.
    pub name: String,
    /// Service version.
    pub version: String,
    /// One-line description.
    pub description: String,
    /// Whether predictions can be served.
    pub model_loaded: bool,
    /// OpenAPI document.
    pub docs: String,
    /// Health probe.
    pub health: String,
    /// Prometheus scrape endpoint, when metrics are enabled.
    pub metrics: Option<String>,
    /// Monitoring dashboard.
    pub dashboard: String,
}

/// GET / - Describe the service.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service description", body = RootResponse),
    ),
    tag = "service"
)]
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = &state.config.api;
    Json(RootResponse {
        name: api.title.clone(),
        version: api.version.clone(),
        description: api.description.clone(),
        model_loaded: state.model.is_loaded(),
        docs: "/openapi.json".to_string(),
        health: "/health".to_string(),
        metrics: state.metrics.as_ref().map(|_| "/metrics".to_string()),
        dashboard: "/monitoring/dashboard".to_string(),
    })
}
