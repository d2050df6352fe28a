//! Request logging into the monitoring database.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use crate::db::requests::{self, RequestRecord};
use crate::middleware::metrics::normalize_path;
use crate::state::AppState;

/// Record every request after its response is produced.
///
/// A failed insert is logged at warn; the response is returned unchanged.
pub async fn request_log_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(pool) = state.db_pool.clone() else {
        return next.run(request).await;
    };

    let timestamp = Utc::now();
    let method = request.method().to_string();
    let path = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(request.uri().path()),
    };
    let start = Instant::now();

    let response = next.run(request).await;

    let record = RequestRecord {
        timestamp,
        method,
        path,
        status: response.status().as_u16(),
        response_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    };
    if let Err(e) = requests::insert(&pool, &record).await {
        tracing::warn!(error = %e, path = %record.path, "failed to log request");
    }

    response
}
