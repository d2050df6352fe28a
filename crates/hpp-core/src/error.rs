//! # Error Types
//!
//! Structured errors shared across the workspace. Validation failures carry
//! the field name, the violated constraint and, where one exists, the value
//! that was rejected.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the pipeline's foundational layer.
#[derive(Error, Debug)]
pub enum HppError {
    /// A record failed schema validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The pipeline configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An algorithm identifier did not match any known algorithm.
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// A single field-level validation failure.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{field}: {constraint}")]
pub struct ValidationError {
    /// Name of the offending field, possibly a path like `instances[3].MedInc`.
    pub field: String,
    /// Human-readable description of the violated constraint.
    pub constraint: String,
    /// The rejected value, when one was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl ValidationError {
    /// Create a violation for `field` without an offending value.
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
            value: None,
        }
    }

    /// Attach the rejected value.
    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Prefix the field path, e.g. `MedInc` becomes `instances[2].MedInc`.
    pub fn within(mut self, prefix: &str) -> Self {
        self.field = format!("{prefix}.{}", self.field);
        self
    }
}

/// Failure loading or validating a [`PipelineConfig`](crate::PipelineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the expected shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// The configuration parsed but holds inconsistent values.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_field() {
        let err = ValidationError::new("MedInc", "must be between 0 and 20").with_value(25.0);
        assert_eq!(err.to_string(), "MedInc: must be between 0 and 20");
        assert_eq!(err.value, Some(serde_json::json!(25.0)));
    }

    #[test]
    fn within_prefixes_field_path() {
        let err = ValidationError::new("Latitude", "must be between 32 and 42").within("instances[4]");
        assert_eq!(err.field, "instances[4].Latitude");
    }

    #[test]
    fn validation_error_serializes_without_missing_value() {
        let err = ValidationError::new("HouseAge", "field required");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["field"], "HouseAge");
        assert!(json.get("value").is_none());
    }

    #[test]
    fn hpp_error_wraps_validation() {
        let err: HppError = ValidationError::new("AveRooms", "too small").into();
        assert!(err.to_string().contains("AveRooms"));
    }
}
