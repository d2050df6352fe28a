//! # Health Routes
//!
//! - `GET /health`           - Liveness and model readiness, always 200
//! - `GET /health/detailed`  - Per-component checks, always 200
//!
//! Both answer 200 so probes can distinguish "process down" from "model not
//! loaded"; readiness is carried in the body.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use hpp_core::temporal::now_timestamp;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db;
use crate::state::AppState;

/// Assemble the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(health_detailed))
}

/// Service health.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` when a model is loaded, else `unhealthy`.
    pub status: String,
    /// Whether predictions can be served.
    pub model_loaded: bool,
    /// Loaded registry version.
    pub model_version: Option<String>,
    /// Registered model name.
    pub model_name: Option<String>,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// Seconds since startup.
    pub uptime_seconds: f64,
}

/// Result of one component check.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    /// `healthy` or `unhealthy`.
    pub status: String,
    /// What was checked, or why it failed.
    pub detail: String,
}

impl ComponentHealth {
    fn from_result(result: Result<String, String>) -> Self {
        match result {
            Ok(detail) => Self {
                status: "healthy".to_string(),
                detail,
            },
            Err(detail) => Self {
                status: "unhealthy".to_string(),
                detail,
            },
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Component checks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthChecks {
    /// The serving model.
    pub model: ComponentHealth,
    /// The request and prediction log.
    pub database: ComponentHealth,
    /// The tracking store holding the registry.
    pub tracking_store: ComponentHealth,
}

/// Detailed service health.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetailedHealthResponse {
    /// `healthy` when every check passes, `degraded` when only the model
    /// passes, `unhealthy` without a model.
    pub overall_status: String,
    /// Component checks.
    pub checks: HealthChecks,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// Seconds since startup.
    pub uptime_seconds: f64,
}

/// GET /health - Basic health.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.model.current();
    Json(HealthResponse {
        status: if model.is_some() { "healthy" } else { "unhealthy" }.to_string(),
        model_loaded: model.is_some(),
        model_version: model.as_ref().map(|m| m.version_label()),
        model_name: model.as_ref().map(|m| m.version.name.clone()),
        timestamp: now_timestamp(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// GET /health/detailed - Check the model, the log database and the store.
#[utoipa::path(
    get,
    path = "/health/detailed",
    responses(
        (status = 200, description = "Component health", body = DetailedHealthResponse),
    ),
    tag = "health"
)]
pub async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let model = ComponentHealth::from_result(match state.model.current() {
        Some(m) => Ok(format!(
            "{} v{} ({}) loaded at {}",
            m.version.name,
            m.version.version,
            m.artifact.algorithm,
            hpp_core::temporal::format_timestamp(m.loaded_at)
        )),
        None => Err("no model loaded".to_string()),
    });

    let database = ComponentHealth::from_result(match &state.db_pool {
        Some(pool) => db::ping(pool)
            .await
            .map(|()| "request log reachable".to_string())
            .map_err(|e| e.to_string()),
        None => Err("request log not configured or failed to open".to_string()),
    });

    let loader = Arc::clone(&state.loader);
    let tracking_store = ComponentHealth::from_result(
        tokio::task::spawn_blocking(move || loader.check_store())
            .await
            .unwrap_or_else(|e| Err(format!("store check failed: {e}"))),
    );

    if let Some(metrics) = &state.metrics {
        metrics.set_health("model", model.is_healthy());
        metrics.set_health("database", database.is_healthy());
        metrics.set_health("tracking_store", tracking_store.is_healthy());
    }

    let overall_status = if !model.is_healthy() {
        "unhealthy"
    } else if database.is_healthy() && tracking_store.is_healthy() {
        "healthy"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        overall_status: overall_status.to_string(),
        checks: HealthChecks {
            model,
            database,
            tracking_store,
        },
        timestamp: now_timestamp(),
        uptime_seconds: state.uptime_seconds(),
    })
}
