//! # Monitoring Routes
//!
//! - `GET /monitoring/metrics/summary?hours=N`      - Request and prediction aggregates
//! - `GET /monitoring/predictions/stats?hours=N`    - Prediction aggregates per model version
//! - `GET /monitoring/dashboard?hours=N`            - HTML rendering of the summary
//!
//! `hours` defaults to 24 and must lie in 1..=720. The JSON endpoints answer
//! 503 when the log database is unavailable; the dashboard renders a notice
//! instead.

use std::fmt::Write as _;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::db::predictions::{self, PredictionStats};
use crate::db::requests::{self, RequestSummary};
use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_query, HoursQuery};
use crate::state::AppState;

/// Assemble the monitoring router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/monitoring/metrics/summary", get(metrics_summary))
        .route("/monitoring/predictions/stats", get(prediction_stats))
        .route("/monitoring/dashboard", get(dashboard))
}

/// Aggregates over a look-back window.
#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsSummary {
    /// Look-back window in hours.
    pub period_hours: u32,
    /// RFC 3339 UTC timestamp.
    pub generated_at: String,
    /// Whether a model is loaded.
    pub model_loaded: bool,
    /// Loaded registry version.
    pub model_version: Option<String>,
    /// Seconds since startup.
    pub uptime_seconds: f64,
    /// HTTP request aggregates.
    pub requests: RequestSummary,
    /// Prediction aggregates.
    pub predictions: PredictionStats,
}

fn log_pool(state: &AppState) -> Result<&SqlitePool, AppError> {
    state
        .db_pool
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("request log database is not available".to_string()))
}

async fn collect(pool: &SqlitePool, hours: u32) -> Result<(RequestSummary, PredictionStats), AppError> {
    let requests = requests::summary(pool, hours)
        .await
        .map_err(|e| AppError::Internal(format!("request summary: {e}")))?;
    let predictions = predictions::stats(pool, hours)
        .await
        .map_err(|e| AppError::Internal(format!("prediction stats: {e}")))?;
    Ok((requests, predictions))
}

/// GET /monitoring/metrics/summary - Aggregate the request and prediction logs.
#[utoipa::path(
    get,
    path = "/monitoring/metrics/summary",
    params(HoursQuery),
    responses(
        (status = 200, description = "Aggregates for the window", body = MetricsSummary),
        (status = 422, description = "hours out of range", body = ErrorBody),
        (status = 503, description = "Log database unavailable", body = ErrorBody),
    ),
    tag = "monitoring"
)]
pub async fn metrics_summary(
    State(state): State<AppState>,
    query: Result<Query<HoursQuery>, QueryRejection>,
) -> Result<Json<MetricsSummary>, AppError> {
    let hours = extract_query(query)?.window()?;
    let pool = log_pool(&state)?;
    let (requests, predictions) = collect(pool, hours).await?;
    let model = state.model.current();

    Ok(Json(MetricsSummary {
        period_hours: hours,
        generated_at: hpp_core::temporal::now_timestamp(),
        model_loaded: model.is_some(),
        model_version: model.map(|m| m.version_label()),
        uptime_seconds: state.uptime_seconds(),
        requests,
        predictions,
    }))
}

/// GET /monitoring/predictions/stats - Prediction aggregates.
#[utoipa::path(
    get,
    path = "/monitoring/predictions/stats",
    params(HoursQuery),
    responses(
        (status = 200, description = "Prediction aggregates", body = PredictionStats),
        (status = 422, description = "hours out of range", body = ErrorBody),
        (status = 503, description = "Log database unavailable", body = ErrorBody),
    ),
    tag = "monitoring"
)]
pub async fn prediction_stats(
    State(state): State<AppState>,
    query: Result<Query<HoursQuery>, QueryRejection>,
) -> Result<Json<PredictionStats>, AppError> {
    let hours = extract_query(query)?.window()?;
    let pool = log_pool(&state)?;
    let stats = predictions::stats(pool, hours)
        .await
        .map_err(|e| AppError::Internal(format!("prediction stats: {e}")))?;
    Ok(Json(stats))
}

/// GET /monitoring/dashboard - HTML summary, refreshed every 30 seconds.
#[utoipa::path(
    get,
    path = "/monitoring/dashboard",
    params(HoursQuery),
    responses(
        (status = 200, description = "HTML dashboard", content_type = "text/html", body = String),
        (status = 422, description = "hours out of range", body = ErrorBody),
    ),
    tag = "monitoring"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    query: Result<Query<HoursQuery>, QueryRejection>,
) -> Result<Html<String>, AppError> {
    let hours = extract_query(query)?.window()?;
    let data = match &state.db_pool {
        Some(pool) => Some(collect(pool, hours).await?),
        None => None,
    };
    let model = state.model.current().map(|m| {
        format!(
            "{} v{} ({}, {})",
            m.version.name,
            m.version.version,
            m.artifact.algorithm,
            m.version.stage
        )
    });
    Ok(Html(render_dashboard(
        &state.config.api.title,
        hours,
        model.as_deref(),
        state.uptime_seconds(),
        data.as_ref(),
    )))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "n/a".to_string(),
    }
}

fn render_dashboard(
    title: &str,
    hours: u32,
    model: Option<&str>,
    uptime_seconds: f64,
    data: Option<&(RequestSummary, PredictionStats)>,
) -> String {
    let mut html = String::new();
    let title = escape_html(title);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"30\">\n<title>{title} monitoring</title>\n\
         <style>body{{font-family:sans-serif;margin:2em;color:#222}}\
         table{{border-collapse:collapse;margin-bottom:1.5em}}\
         td,th{{border:1px solid #ccc;padding:4px 10px;text-align:left}}\
         th{{background:#f0f0f0}}.warn{{color:#b00}}</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n<p>Window: last {hours} hour(s). Uptime: {uptime_seconds:.0} s.</p>\n"
    );

    match model {
        Some(m) => {
            let _ = writeln!(html, "<p>Serving model: <strong>{}</strong></p>", escape_html(m));
        }
        None => {
            let _ = writeln!(html, "<p class=\"warn\">No model loaded.</p>");
        }
    }

    let Some((requests, predictions)) = data else {
        let _ = writeln!(html, "<p class=\"warn\">Request log unavailable.</p>\n</body>\n</html>");
        return html;
    };

    let _ = write!(
        html,
        "<h2>Requests</h2>\n<table>\n\
         <tr><th>Total</th><td>{}</td></tr>\n\
         <tr><th>Errors</th><td>{} ({:.2}%)</td></tr>\n\
         <tr><th>Mean response (ms)</th><td>{}</td></tr>\n\
         <tr><th>p95 response (ms)</th><td>{}</td></tr>\n\
         <tr><th>Max response (ms)</th><td>{}</td></tr>\n</table>\n",
        requests.total_requests,
        requests.error_requests,
        requests.error_rate * 100.0,
        fmt_opt(requests.avg_response_time_ms, 2),
        fmt_opt(requests.p95_response_time_ms, 2),
        fmt_opt(requests.max_response_time_ms, 2),
    );

    if !requests.by_endpoint.is_empty() {
        let _ = writeln!(
            html,
            "<table>\n<tr><th>Method</th><th>Path</th><th>Requests</th><th>Errors</th><th>Mean (ms)</th></tr>"
        );
        for e in &requests.by_endpoint {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
                escape_html(&e.method),
                escape_html(&e.path),
                e.count,
                e.error_count,
                e.avg_response_time_ms
            );
        }
        let _ = writeln!(html, "</table>");
    }

    let _ = write!(
        html,
        "<h2>Predictions</h2>\n<table>\n\
         <tr><th>Total</th><td>{} ({} single, {} batch)</td></tr>\n\
         <tr><th>Mean</th><td>{}</td></tr>\n\
         <tr><th>Std</th><td>{}</td></tr>\n\
         <tr><th>Range</th><td>{} to {}</td></tr>\n\
         <tr><th>Mean latency (ms)</th><td>{}</td></tr>\n</table>\n",
        predictions.total_predictions,
        predictions.single_predictions,
        predictions.batch_predictions,
        fmt_opt(predictions.mean_prediction, 3),
        fmt_opt(predictions.std_prediction, 3),
        fmt_opt(predictions.min_prediction, 3),
        fmt_opt(predictions.max_prediction, 3),
        fmt_opt(predictions.avg_latency_ms, 3),
    );

    if !predictions.by_model_version.is_empty() {
        let _ = writeln!(html, "<table>\n<tr><th>Model version</th><th>Predictions</th><th>Mean</th></tr>");
        for v in &predictions.by_model_version {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{:.3}</td></tr>",
                escape_html(&v.model_version),
                v.count,
                v.mean_prediction
            );
        }
        let _ = writeln!(html, "</table>");
    }

    let _ = writeln!(html, "</body>\n</html>");
    html
}
