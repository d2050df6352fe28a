//! # Prometheus Metrics
//!
//! Metrics are recorded through the `metrics` facade into a
//! `PrometheusRecorder` owned by [`ApiMetrics`]. The recorder is scoped with
//! `metrics::with_local_recorder` rather than installed globally, so each
//! application instance (and each test) has its own registry.
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Prediction metrics are recorded by the prediction handlers.
//! Uptime and model gauges are refreshed on each `/metrics` scrape (pull
//! model), see the handler in `routes/metrics.rs`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Prediction buckets in units of $100,000.
const VALUE_BUCKETS: &[f64] = &[0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 6.0];

/// How a prediction was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionKind {
    /// `POST /predict`.
    Single,
    /// `POST /predict/batch`.
    Batch,
}

impl PredictionKind {
    /// Label value, also stored as the prediction log's `source`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch => "batch",
        }
    }
}

/// Shared metrics state backed by a local Prometheus recorder.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    requests: AtomicU64,
    errors: AtomicU64,
    predictions: AtomicU64,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .field("predictions", &self.predictions())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh recorder.
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), LATENCY_BUCKETS)?
            .set_buckets_for_metric(Matcher::Full("hpp_prediction_value".to_string()), VALUE_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();
        let metrics = Self {
            inner: Arc::new(Inner {
                recorder,
                handle,
                requests: AtomicU64::new(0),
                errors: AtomicU64::new(0),
                predictions: AtomicU64::new(0),
            }),
        };
        metrics.set_model_loaded(false);
        Ok(metrics)
    }

    fn with<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(&self.inner.recorder, f)
    }

    /// Total requests recorded.
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    /// Total 4xx and 5xx responses recorded.
    pub fn errors(&self) -> u64 {
        self.inner.errors.load(Ordering::Relaxed)
    }

    /// Total predictions served, counting each batch item.
    pub fn predictions(&self) -> u64 {
        self.inner.predictions.load(Ordering::Relaxed)
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        self.inner.requests.fetch_add(1, Ordering::Relaxed);
        let method = method.to_string();
        let path = path.to_string();
        let status_str = status.to_string();
        self.with(|| {
            counter!(
                "hpp_http_requests_total",
                "method" => method.clone(),
                "path" => path.clone(),
                "status" => status_str.clone()
            )
            .increment(1);
            histogram!(
                "hpp_http_request_duration_seconds",
                "method" => method.clone(),
                "path" => path.clone()
            )
            .record(duration_secs);
            if status >= 400 {
                counter!(
                    "hpp_http_errors_total",
                    "method" => method,
                    "path" => path,
                    "status" => status_str
                )
                .increment(1);
            }
        });
        if status >= 400 {
            self.inner.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record served predictions and the time spent in the model.
    pub fn record_predictions(
        &self,
        model_version: &str,
        kind: PredictionKind,
        values: &[f64],
        inference_secs: f64,
    ) {
        let count = values.len() as u64;
        self.inner.predictions.fetch_add(count, Ordering::Relaxed);
        let version = model_version.to_string();
        self.with(|| {
            counter!(
                "hpp_predictions_total",
                "model_version" => version.clone(),
                "kind" => kind.as_str()
            )
            .increment(count);
            let value_histogram = histogram!("hpp_prediction_value");
            for v in values {
                value_histogram.record(*v);
            }
            histogram!("hpp_inference_duration_seconds", "kind" => kind.as_str()).record(inference_secs);
        });
    }

    /// Count a reload attempt by outcome.
    pub fn record_reload(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.with(|| counter!("hpp_model_reloads_total", "outcome" => outcome).increment(1));
    }

    /// Set the model-loaded gauge.
    pub fn set_model_loaded(&self, loaded: bool) {
        self.with(|| gauge!("hpp_model_loaded").set(if loaded { 1.0 } else { 0.0 }));
    }

    /// Set the uptime gauge.
    pub fn set_uptime(&self, seconds: f64) {
        self.with(|| gauge!("hpp_uptime_seconds").set(seconds));
    }

    /// Set a component's health gauge: 1 healthy, 0 otherwise.
    pub fn set_health(&self, component: &'static str, healthy: bool) {
        self.with(|| {
            gauge!("hpp_health_status", "component" => component).set(if healthy { 1.0 } else { 0.0 })
        });
    }

    /// Render the Prometheus text exposition.
    pub fn render(&self) -> String {
        self.inner.handle.render()
    }
}

/// Normalize a request path by replacing UUID segments with `{id}`.
///
/// Prevents cardinality explosion in Prometheus labels. UUIDs are detected
/// as 32-hex-char strings with optional hyphens (standard UUID format).
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            // 8-4-4-4-12 hex chars with hyphens
            if segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if i == 8 || i == 13 || i == 18 || i == 23 {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                })
            {
                "{id}"
            } else if segment.len() == 32 && segment.chars().all(|c| c.is_ascii_hexdigit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics.
///
/// Uses the route template when the request matched a route, so unknown
/// paths collapse into the normalized request path.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(request.uri().path()),
    };
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ApiMetrics {
        ApiMetrics::new().unwrap()
    }

    #[test]
    fn api_metrics_new_starts_at_zero() {
        let m = metrics();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
        assert_eq!(m.predictions(), 0);
    }

    #[test]
    fn requests_increments() {
        let m = metrics();
        m.record_request("GET", "/health", 200, 0.01);
        assert_eq!(m.requests(), 1);
        m.record_request("POST", "/predict", 200, 0.02);
        m.record_request("GET", "/other", 200, 0.005);
        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_increments() {
        let m = metrics();
        m.record_request("POST", "/predict", 422, 0.1);
        assert_eq!(m.errors(), 1);
        m.record_request("POST", "/predict", 503, 0.05);
        assert_eq!(m.errors(), 2);
        assert_eq!(m.requests(), 2);
    }

    #[test]
    fn render_exposes_request_counter() {
        let m = metrics();
        m.record_request("GET", "/health", 200, 0.003);
        let text = m.render();
        assert!(text.contains("hpp_http_requests_total"));
        assert!(text.contains("path=\"/health\""));
        assert!(text.contains("hpp_http_request_duration_seconds_bucket"));
        assert!(text.contains("hpp_model_loaded"));
    }

    #[test]
    fn predictions_count_batch_items() {
        let m = metrics();
        m.record_predictions("3", PredictionKind::Batch, &[1.0, 2.0, 3.5], 0.001);
        m.record_predictions("3", PredictionKind::Single, &[2.2], 0.0005);
        assert_eq!(m.predictions(), 4);
        let text = m.render();
        assert!(text.contains("hpp_predictions_total"));
        assert!(text.contains("kind=\"batch\""));
        assert!(text.contains("hpp_prediction_value_bucket"));
    }

    #[test]
    fn recorders_are_independent() {
        let a = metrics();
        let b = metrics();
        a.record_reload(true);
        assert!(a.render().contains("hpp_model_reloads_total"));
        assert!(!b.render().contains("hpp_model_reloads_total"));
    }

    #[test]
    fn normalize_replaces_uuid() {
        assert_eq!(
            normalize_path("/predictions/550e8400-e29b-41d4-a716-446655440000"),
            "/predictions/{id}"
        );
    }

    #[test]
    fn normalize_replaces_hex32() {
        assert_eq!(
            normalize_path("/predictions/550e8400e29b41d4a716446655440000/raw"),
            "/predictions/{id}/raw"
        );
    }

    #[test]
    fn normalize_preserves_static_paths() {
        assert_eq!(normalize_path("/predict/batch"), "/predict/batch");
        assert_eq!(normalize_path("/"), "/");
    }
}
