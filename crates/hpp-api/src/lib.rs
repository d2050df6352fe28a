//! # hpp-api - Prediction Service for the Housing Price Pipeline
//!
//! Serves the registered model over HTTP, validates every input against the
//! shared feature schema, and records what it served.
//!
//! ## API Surface
//!
//! | Path                              | Module                    | Purpose |
//! |-----------------------------------|---------------------------|---------|
//! | `/`                               | [`routes::root`]          | Service description |
//! | `/predict`, `/predict/batch`      | [`routes::prediction`]    | Predictions |
//! | `/health`, `/health/detailed`     | [`routes::health`]        | Probes |
//! | `/model/info`, `/model/reload`    | [`routes::model`]         | Serving model |
//! | `/monitoring/*`                   | [`routes::monitoring`]    | Log aggregates, dashboard |
//! | `/metrics`                        | [`routes::metrics`]       | Prometheus scrape |
//! | `/openapi.json`                   | [`openapi`]               | OpenAPI document |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → RequestLog → MetricsMiddleware → BodyLimit → Handler
//! ```
//!
//! The metrics middleware and `/metrics` are only mounted when
//! `monitoring.metrics_enabled` is true. The request log is skipped when the
//! database could not be opened.

pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppState, ModelLoader, ModelSlot, RegistryLoader, ServingModel};

/// Largest accepted request body. A full batch of 100 records is ~30 KiB.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let mut api = Router::new()
        .merge(routes::root::router())
        .merge(routes::prediction::router())
        .merge(routes::health::router())
        .merge(routes::model::router())
        .merge(routes::monitoring::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    // Only register the metrics middleware and scrape route when enabled.
    if let Some(metrics) = state.metrics.clone() {
        api = api
            .merge(routes::metrics::router())
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(axum::Extension(metrics));
    }

    api.layer(from_fn_with_state(
        state.clone(),
        middleware::request_log::request_log_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(cors_layer(&state.config.api.cors_allow_origins))
    .with_state(state)
}

/// CORS policy from `api.cors_allow_origins`; `*` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}
