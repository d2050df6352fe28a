//! # Request Extractors
//!
//! Handlers take `Result<Json<T>, JsonRejection>` (or the `Query`
//! equivalent) and pass it through these helpers, so a malformed body is
//! reported in the service's own error format rather than axum's plain-text
//! rejection.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use hpp_core::ValidationError;
use serde::Deserialize;

use crate::error::AppError;

/// Unwrap a JSON body or map the rejection to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Unwrap a query string or map the rejection to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Smallest accepted monitoring window.
pub const MIN_HOURS: u32 = 1;
/// Largest accepted monitoring window (30 days).
pub const MAX_HOURS: u32 = 720;

/// `?hours=N` on the monitoring endpoints.
#[derive(Debug, Clone, Copy, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HoursQuery {
    /// Look-back window in hours, 1 to 720. Defaults to 24.
    pub hours: Option<u32>,
}

impl HoursQuery {
    /// The validated window.
    pub fn window(&self) -> Result<u32, AppError> {
        let hours = self.hours.unwrap_or(24);
        if !(MIN_HOURS..=MAX_HOURS).contains(&hours) {
            return Err(ValidationError::new("hours", format!("must be between {MIN_HOURS} and {MAX_HOURS}"))
                .with_value(hours)
                .into());
        }
        Ok(hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_default_to_a_day() {
        assert_eq!(HoursQuery { hours: None }.window().unwrap(), 24);
    }

    #[test]
    fn hours_out_of_range_are_rejected() {
        for bad in [0, 721] {
            let err = HoursQuery { hours: Some(bad) }.window().unwrap_err();
            assert!(matches!(err, AppError::Validation(ref v) if v.field == "hours"));
        }
        assert_eq!(HoursQuery { hours: Some(720) }.window().unwrap(), 720);
    }
}
