//! The serialized form of a trained model, as stored in the registry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hpp_core::{Algorithm, FeatureVector, Hyperparameters, FEATURE_NAMES};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::regressor::Regressor;

/// Pair each value with its feature name.
pub fn feature_map(values: &FeatureVector) -> BTreeMap<String, f64> {
    FEATURE_NAMES
        .iter()
        .zip(values)
        .map(|(name, v)| (name.to_string(), *v))
        .collect()
}

/// A fitted regressor plus the context needed to serve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Algorithm family.
    pub algorithm: Algorithm,
    /// Hyperparameters the model was refitted with.
    pub params: Hyperparameters,
    /// Input column order the model expects.
    pub feature_names: Vec<String>,
    /// The fitted model.
    pub regressor: Regressor,
    /// When the final refit finished.
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Wrap a freshly fitted regressor.
    pub fn new(algorithm: Algorithm, params: Hyperparameters, regressor: Regressor) -> Self {
        Self {
            algorithm,
            params,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            regressor,
            trained_at: Utc::now(),
        }
    }

    /// Reject artifacts trained on a different column layout.
    pub fn check_schema(&self) -> Result<(), ModelError> {
        if self.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied()) {
            return Err(ModelError::SchemaMismatch(format!(
                "expected features {:?}, artifact has {:?}",
                FEATURE_NAMES, self.feature_names
            )));
        }
        Ok(())
    }

    /// Predict one row.
    pub fn predict_one(&self, x: &FeatureVector) -> f64 {
        self.regressor.predict_one(x)
    }

    /// Predict many rows.
    pub fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
        self.regressor.predict(rows)
    }

    /// Human-readable estimator name, e.g. `RandomForestRegressor`.
    pub fn model_type(&self) -> &'static str {
        self.algorithm.model_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ModelArtifact {
        let x: Vec<FeatureVector> = (0..20)
            .map(|i| {
                let t = i as f64;
                [t, t % 3.0, 5.0, 1.0, 300.0 + t, 2.5, 34.0, -118.0]
            })
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 0.5 * r[0]).collect();
        let regressor = Regressor::fit(Algorithm::LinearRegression, &Hyperparameters::new(), &x, &y, 0).unwrap();
        ModelArtifact::new(Algorithm::LinearRegression, Hyperparameters::new(), regressor)
    }

    #[test]
    fn fresh_artifact_matches_schema() {
        let a = artifact();
        a.check_schema().unwrap();
        assert_eq!(a.model_type(), "LinearRegression");
    }

    #[test]
    fn reordered_features_are_rejected() {
        let mut a = artifact();
        a.feature_names.swap(0, 1);
        assert!(matches!(a.check_schema(), Err(ModelError::SchemaMismatch(_))));
        a.feature_names.truncate(3);
        assert!(a.check_schema().is_err());
    }

    #[test]
    fn json_round_trip() {
        let a = artifact();
        let back: ModelArtifact = serde_json::from_slice(&serde_json::to_vec(&a).unwrap()).unwrap();
        assert_eq!(back, a);
    }
}
