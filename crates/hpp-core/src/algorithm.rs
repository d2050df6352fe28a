//! # Regression Algorithms
//!
//! Identifies the estimator families the trainer can search over. The
//! snake_case identifier is used in configuration and tracking run names;
//! [`Algorithm::model_type`] is the estimator class name reported by the
//! prediction service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HppError;

/// An estimator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Ordinary least squares on standardized features.
    LinearRegression,
    /// L2-penalized least squares on standardized features.
    Ridge,
    /// L1-penalized least squares on standardized features.
    Lasso,
    /// A single CART regression tree.
    DecisionTree,
    /// Bagged CART regression trees.
    RandomForest,
}

impl Algorithm {
    /// Every algorithm, in declaration order.
    pub fn all() -> &'static [Algorithm] {
        &[
            Self::LinearRegression,
            Self::Ridge,
            Self::Lasso,
            Self::DecisionTree,
            Self::RandomForest,
        ]
    }

    /// The snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinearRegression => "linear_regression",
            Self::Ridge => "ridge",
            Self::Lasso => "lasso",
            Self::DecisionTree => "decision_tree",
            Self::RandomForest => "random_forest",
        }
    }

    /// Estimator class name.
    pub fn model_type(&self) -> &'static str {
        match self {
            Self::LinearRegression => "LinearRegression",
            Self::Ridge => "Ridge",
            Self::Lasso => "Lasso",
            Self::DecisionTree => "DecisionTreeRegressor",
            Self::RandomForest => "RandomForestRegressor",
        }
    }

    /// Whether the fitted model exposes impurity-based feature importances.
    pub fn is_tree_based(&self) -> bool {
        matches!(self, Self::DecisionTree | Self::RandomForest)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = HppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| HppError::UnknownAlgorithm(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_identifier() {
        for alg in Algorithm::all() {
            assert_eq!(alg.as_str().parse::<Algorithm>().unwrap(), *alg);
            let json = serde_json::to_string(alg).unwrap();
            assert_eq!(json, format!("\"{}\"", alg.as_str()));
        }
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let err = "xgboost".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, HppError::UnknownAlgorithm(ref s) if s == "xgboost"));
    }

    #[test]
    fn tree_based_flags() {
        assert!(Algorithm::RandomForest.is_tree_based());
        assert!(!Algorithm::Ridge.is_tree_based());
        assert_eq!(Algorithm::DecisionTree.model_type(), "DecisionTreeRegressor");
    }
}
