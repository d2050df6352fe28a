//! A fitted model of any supported family behind one type.

use hpp_core::{Algorithm, FeatureVector, Hyperparameters};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::forest::RandomForest;
use crate::linear::LinearModel;
use crate::tree::DecisionTree;

/// A fitted regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    /// Scaled linear model (OLS, ridge or lasso).
    Linear(LinearModel),
    /// Single regression tree.
    Tree(DecisionTree),
    /// Bagged trees.
    Forest(RandomForest),
}

impl Regressor {
    /// Fit `algorithm` with `params` on `x`/`y`. `seed` drives any randomness.
    pub fn fit(
        algorithm: Algorithm,
        params: &Hyperparameters,
        x: &[FeatureVector],
        y: &[f64],
        seed: u64,
    ) -> Result<Self, ModelError> {
        let model = match algorithm {
            Algorithm::LinearRegression | Algorithm::Ridge | Algorithm::Lasso => {
                Self::Linear(LinearModel::fit_with_params(algorithm, params, x, y)?)
            }
            Algorithm::DecisionTree => Self::Tree(DecisionTree::fit_with_params(params, x, y, seed)?),
            Algorithm::RandomForest => Self::Forest(RandomForest::fit_with_params(params, x, y, seed)?),
        };
        Ok(model)
    }

    /// Predict one row.
    pub fn predict_one(&self, x: &FeatureVector) -> f64 {
        match self {
            Self::Linear(m) => m.predict_one(x),
            Self::Tree(m) => m.predict_one(x),
            Self::Forest(m) => m.predict_one(x),
        }
    }

    /// Predict many rows.
    pub fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_one(r)).collect()
    }

    /// Impurity-based importances; tree families only.
    pub fn feature_importances(&self) -> Option<FeatureVector> {
        match self {
            Self::Linear(_) => None,
            Self::Tree(m) => Some(*m.feature_importances()),
            Self::Forest(m) => Some(*m.feature_importances()),
        }
    }

    /// Importances for plotting: impurity-based for trees, normalized
    /// absolute standardized coefficients for linear models.
    pub fn importance_profile(&self) -> FeatureVector {
        match self {
            Self::Linear(m) => m.coefficient_importances(),
            other => other.feature_importances().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpp_core::N_FEATURES;

    fn rows() -> (Vec<FeatureVector>, Vec<f64>) {
        let x: Vec<FeatureVector> = (0..60)
            .map(|i| {
                let t = i as f64;
                [t % 9.0, t % 5.0, 4.0 + t % 3.0, 1.0, 200.0 + t, 2.0 + t % 4.0, 35.0, -119.0]
            })
            .collect();
        let y = x.iter().map(|r| 1.0 + 0.4 * r[0]).collect();
        (x, y)
    }

    #[test]
    fn every_algorithm_fits_and_predicts_finite_values() {
        let (x, y) = rows();
        for &alg in Algorithm::all() {
            let mut params = Hyperparameters::new();
            if alg == Algorithm::RandomForest {
                params.insert("n_estimators".into(), 5_i64.into());
            }
            let model = Regressor::fit(alg, &params, &x, &y, 42).unwrap();
            assert!(model.predict(&x).iter().all(|p| p.is_finite()), "{alg}");
            assert_eq!(model.feature_importances().is_some(), alg.is_tree_based());
        }
    }

    #[test]
    fn serialized_form_is_tagged() {
        let (x, y) = rows();
        let model = Regressor::fit(Algorithm::Ridge, &Hyperparameters::new(), &x, &y, 0).unwrap();
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["kind"], "linear");
        let back: Regressor = serde_json::from_value(json).unwrap();
        assert_eq!(back.predict_one(&x[3]), model.predict_one(&x[3]));
    }

    #[test]
    fn linear_profile_uses_coefficients() {
        let (x, y) = rows();
        let model = Regressor::fit(Algorithm::LinearRegression, &Hyperparameters::new(), &x, &y, 0).unwrap();
        let profile = model.importance_profile();
        let top = (0..N_FEATURES).max_by(|&a, &b| profile[a].total_cmp(&profile[b])).unwrap();
        assert_eq!(top, 0);
    }
}
