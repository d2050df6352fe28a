//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every failure leaves the service as `{"error": {"code", "message",
//! "details"?}}`. Validation failures carry the offending field, constraint
//! and value in `details`; server-side failures never expose internals.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hpp_core::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// The error.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "MODEL_NOT_READY").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Field-level context, present only for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// A field failed validation (422).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Request body or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No model is loaded (503).
    #[error("model not loaded; train and register a model, then POST /model/reload")]
    ModelNotReady,

    /// A dependency such as the request log is unavailable (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Reloading the model failed; the previous model keeps serving (500).
    #[error("model reload failed: {0}")]
    ReloadFailed(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::ModelNotReady => (StatusCode::SERVICE_UNAVAILABLE, "MODEL_NOT_READY"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::ReloadFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MODEL_RELOAD_FAILED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ReloadFailed(_) => tracing::error!(error = %self, "model reload failed"),
            Self::ModelNotReady | Self::ServiceUnavailable(_) => {
                tracing::warn!(error = %self, "service unavailable")
            }
            _ => {}
        }

        let details = match &self {
            Self::Validation(violation) => serde_json::to_value(violation).ok(),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}
