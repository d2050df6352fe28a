//! # Hyperparameter Values
//!
//! Hyperparameters travel through YAML configuration, tracking runs and the
//! registry as plain scalars. `null` is meaningful: `max_depth: null` grows
//! trees until their leaves are pure.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single hyperparameter setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag, e.g. `fit_intercept`.
    Bool(bool),
    /// Integer setting, e.g. `n_estimators`.
    Int(i64),
    /// Real-valued setting, e.g. `alpha`.
    Float(f64),
    /// Explicitly unset, e.g. an unbounded `max_depth`.
    None,
}

impl ParamValue {
    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Non-negative integer view. Floats with no fractional part qualify.
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Int(i) if *i >= 0 => Some(*i as usize),
            Self::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as usize),
            _ => None,
        }
    }

    /// Boolean view.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is the explicit `null` setting.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::None => f.write_str("None"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

/// One concrete hyperparameter assignment, keyed by parameter name.
pub type Hyperparameters = BTreeMap<String, ParamValue>;

/// Candidate values per parameter name.
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_scalars_map_to_variants() {
        let grid: ParamGrid = serde_yaml::from_str(
            "alpha: [0.1, 10]\nfit_intercept: [true, false]\nmax_depth: [5, null]\n",
        )
        .unwrap();
        assert_eq!(grid["alpha"], vec![ParamValue::Float(0.1), ParamValue::Int(10)]);
        assert_eq!(grid["fit_intercept"][1], ParamValue::Bool(false));
        assert_eq!(grid["max_depth"][1], ParamValue::None);
    }

    #[test]
    fn none_serializes_as_null() {
        let json = serde_json::to_string(&ParamValue::None).unwrap();
        assert_eq!(json, "null");
        let back: ParamValue = serde_json::from_str("null").unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn numeric_views() {
        assert_eq!(ParamValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(ParamValue::Float(4.0).as_usize(), Some(4));
        assert_eq!(ParamValue::Float(4.5).as_usize(), None);
        assert_eq!(ParamValue::Int(-1).as_usize(), None);
        assert_eq!(ParamValue::Bool(true).as_f64(), None);
    }

    #[test]
    fn option_conversion() {
        assert_eq!(ParamValue::from(None::<i64>), ParamValue::None);
        assert_eq!(ParamValue::from(Some(20_i64)), ParamValue::Int(20));
        assert_eq!(ParamValue::None.to_string(), "None");
    }
}
