//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`metrics`]: Prometheus request metrics, mounted only when enabled.
//! - [`request_log`]: one row per request in the SQLite log.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly in `lib.rs`.

pub mod metrics;
pub mod request_log;
