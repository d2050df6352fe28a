//! # Prometheus Scrape Route
//!
//! - `GET /metrics` - Prometheus text exposition
//!
//! Mounted only when metrics are enabled. Gauges that describe current state
//! (uptime, model loaded) are refreshed on each scrape.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the scrape router.
pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(prometheus_metrics))
}

/// GET /metrics - Render all recorded metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus text exposition", content_type = "text/plain", body = String),
    ),
    tag = "monitoring"
)]
pub async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    let loaded = state.model.is_loaded();
    metrics.set_uptime(state.uptime_seconds());
    metrics.set_model_loaded(loaded);
    metrics.set_health("model", loaded);
    metrics.set_health("database", state.db_pool.is_some());

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics.render(),
    )
}
