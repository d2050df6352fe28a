//! # Linear Models
//!
//! Ordinary least squares, ridge and lasso, each fitted on standardized
//! features. The scaler is part of the fitted model, so callers always pass
//! raw feature vectors.
//!
//! Ridge solves `(ZᵀZ + αI) w = Zᵀ(y − ȳ)`; the intercept is not penalized.
//! Lasso minimizes `(1/2n)‖y − ȳ − Zw‖² + α‖w‖₁` by cyclic coordinate
//! descent, stopping when the largest coefficient update drops below `tol`.

use hpp_core::{Algorithm, FeatureVector, Hyperparameters, N_FEATURES};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::hyper::ParamReader;
use crate::linalg;
use crate::scaler::StandardScaler;

/// A fitted linear model with its input scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    scaler: StandardScaler,
    coefficients: FeatureVector,
    intercept: f64,
}

/// Which penalty to fit with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Penalty {
    /// No penalty.
    None,
    /// Squared L2 penalty of the given strength.
    L2(f64),
    /// L1 penalty of the given strength.
    L1 {
        /// Penalty strength.
        alpha: f64,
        /// Maximum coordinate descent sweeps.
        max_iter: usize,
        /// Convergence threshold on the largest coefficient change.
        tol: f64,
    },
}

impl LinearModel {
    /// Fit `algorithm` (one of the linear families) with `params`.
    pub fn fit_with_params(
        algorithm: Algorithm,
        params: &Hyperparameters,
        x: &[FeatureVector],
        y: &[f64],
    ) -> Result<Self, ModelError> {
        let mut p = ParamReader::new(algorithm, params);
        let fit_intercept = p.bool("fit_intercept", true)?;
        let penalty = match algorithm {
            Algorithm::LinearRegression => Penalty::None,
            Algorithm::Ridge => {
                let alpha = p.f64("alpha", 1.0)?;
                p.ensure(alpha >= 0.0, "alpha", "must be non-negative")?;
                Penalty::L2(alpha)
            }
            Algorithm::Lasso => {
                let alpha = p.f64("alpha", 1.0)?;
                let max_iter = p.usize("max_iter", 1000)?;
                let tol = p.f64("tol", 1e-4)?;
                p.ensure(alpha >= 0.0, "alpha", "must be non-negative")?;
                p.ensure(max_iter > 0, "max_iter", "must be positive")?;
                p.ensure(tol > 0.0, "tol", "must be positive")?;
                Penalty::L1 { alpha, max_iter, tol }
            }
            other => {
                return Err(ModelError::InvalidParameter {
                    algorithm: other,
                    name: "algorithm".to_string(),
                    reason: "not a linear model".to_string(),
                })
            }
        };
        p.finish()?;
        Self::fit(algorithm, penalty, fit_intercept, x, y)
    }

    /// Fit with an explicit penalty.
    pub fn fit(
        algorithm: Algorithm,
        penalty: Penalty,
        fit_intercept: bool,
        x: &[FeatureVector],
        y: &[f64],
    ) -> Result<Self, ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let scaler = StandardScaler::fit(x);
        let z = scaler.transform_all(x);
        let n = y.len() as f64;
        let y_mean = if fit_intercept { y.iter().sum::<f64>() / n } else { 0.0 };
        let target: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let coefficients = match penalty {
            Penalty::None => normal_equations(&z, &target, 0.0).ok_or(ModelError::Singular(algorithm))?,
            Penalty::L2(alpha) => normal_equations(&z, &target, alpha).ok_or(ModelError::Singular(algorithm))?,
            Penalty::L1 { alpha, max_iter, tol } => coordinate_descent(&z, &target, alpha, max_iter, tol),
        };

        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::NonFinite(format!("{algorithm} coefficients")));
        }
        Ok(Self {
            scaler,
            coefficients,
            intercept: y_mean,
        })
    }

    /// Predict one row.
    pub fn predict_one(&self, x: &FeatureVector) -> f64 {
        let z = self.scaler.transform(x);
        self.intercept + z.iter().zip(&self.coefficients).map(|(a, b)| a * b).sum::<f64>()
    }

    /// Coefficients on the standardized features.
    pub fn coefficients(&self) -> &FeatureVector {
        &self.coefficients
    }

    /// Intercept on the original target scale.
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Absolute standardized coefficients normalized to sum to 1.
    pub fn coefficient_importances(&self) -> FeatureVector {
        let mut out = self.coefficients.map(f64::abs);
        let total: f64 = out.iter().sum();
        if total > 0.0 {
            out.iter_mut().for_each(|v| *v /= total);
        }
        out
    }
}

fn normal_equations(z: &[FeatureVector], y: &[f64], alpha: f64) -> Option<FeatureVector> {
    let mut a = vec![vec![0.0; N_FEATURES]; N_FEATURES];
    let mut b = vec![0.0; N_FEATURES];
    for (row, &target) in z.iter().zip(y) {
        for i in 0..N_FEATURES {
            b[i] += row[i] * target;
            for j in i..N_FEATURES {
                a[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..N_FEATURES {
        for j in 0..i {
            a[i][j] = a[j][i];
        }
        // constant column: standardized to all zeros, pin its weight to 0
        if a[i][i] < 1e-12 {
            a[i][i] = 1.0;
            b[i] = 0.0;
        }
        a[i][i] += alpha;
    }
    let w = linalg::solve(a, b)?;
    let mut out = [0.0; N_FEATURES];
    out.copy_from_slice(&w);
    Some(out)
}

fn coordinate_descent(z: &[FeatureVector], y: &[f64], alpha: f64, max_iter: usize, tol: f64) -> FeatureVector {
    let n = y.len() as f64;
    let mut w = [0.0; N_FEATURES];
    let mut residual: Vec<f64> = y.to_vec();
    let col_norm: Vec<f64> = (0..N_FEATURES)
        .map(|j| z.iter().map(|r| r[j] * r[j]).sum::<f64>() / n)
        .collect();

    for _ in 0..max_iter {
        let mut max_delta = 0.0_f64;
        for j in 0..N_FEATURES {
            if col_norm[j] == 0.0 {
                continue;
            }
            let rho = z
                .iter()
                .zip(&residual)
                .map(|(r, e)| r[j] * (e + r[j] * w[j]))
                .sum::<f64>()
                / n;
            let updated = soft_threshold(rho, alpha) / col_norm[j];
            let delta = updated - w[j];
            if delta != 0.0 {
                for (r, e) in z.iter().zip(residual.iter_mut()) {
                    *e -= r[j] * delta;
                }
                w[j] = updated;
            }
            max_delta = max_delta.max(delta.abs());
        }
        if max_delta < tol {
            break;
        }
    }
    w
}

fn soft_threshold(x: f64, lambda: f64) -> f64 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpp_core::ParamValue;

    /// y = 2 + 3·x0 − 1.5·x2; the remaining columns are distractors.
    fn linear_data(n: usize) -> (Vec<FeatureVector>, Vec<f64>) {
        let x: Vec<FeatureVector> = (0..n)
            .map(|i| {
                let t = i as f64;
                [
                    t % 7.0,
                    (t * 0.37).sin() * 3.0,
                    (t % 11.0) * 0.5,
                    (t * 1.3).cos(),
                    100.0 + (t % 13.0),
                    1.0 + (t % 5.0),
                    34.0 + (t % 3.0),
                    -118.0 - (t % 4.0),
                ]
            })
            .collect();
        let y = x.iter().map(|r| 2.0 + 3.0 * r[0] - 1.5 * r[2]).collect();
        (x, y)
    }

    fn params(pairs: &[(&str, ParamValue)]) -> Hyperparameters {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn ols_recovers_exact_relationship() {
        let (x, y) = linear_data(200);
        let m = LinearModel::fit_with_params(Algorithm::LinearRegression, &Hyperparameters::new(), &x, &y).unwrap();
        for (row, target) in x.iter().zip(&y) {
            assert!((m.predict_one(row) - target).abs() < 1e-8);
        }
    }

    #[test]
    fn ridge_shrinks_coefficients() {
        let (x, y) = linear_data(200);
        let weak = LinearModel::fit_with_params(
            Algorithm::Ridge,
            &params(&[("alpha", ParamValue::Float(0.01))]),
            &x,
            &y,
        )
        .unwrap();
        let strong = LinearModel::fit_with_params(
            Algorithm::Ridge,
            &params(&[("alpha", ParamValue::Float(1000.0))]),
            &x,
            &y,
        )
        .unwrap();
        let norm = |m: &LinearModel| m.coefficients().iter().map(|c| c * c).sum::<f64>();
        assert!(norm(&strong) < norm(&weak));
    }

    #[test]
    fn lasso_zeroes_irrelevant_features() {
        let (x, y) = linear_data(300);
        let m = LinearModel::fit_with_params(
            Algorithm::Lasso,
            &params(&[("alpha", ParamValue::Float(0.1))]),
            &x,
            &y,
        )
        .unwrap();
        let c = m.coefficients();
        assert!(c[0] > 1.0, "relevant feature kept: {c:?}");
        assert!(c[7].abs() < 1e-9, "irrelevant feature dropped: {c:?}");
    }

    #[test]
    fn without_intercept_has_zero_intercept() {
        let (x, y) = linear_data(100);
        let m = LinearModel::fit_with_params(
            Algorithm::LinearRegression,
            &params(&[("fit_intercept", ParamValue::Bool(false))]),
            &x,
            &y,
        )
        .unwrap();
        assert_eq!(m.intercept(), 0.0);
    }

    #[test]
    fn negative_alpha_is_invalid() {
        let (x, y) = linear_data(20);
        let err = LinearModel::fit_with_params(
            Algorithm::Ridge,
            &params(&[("alpha", ParamValue::Float(-1.0))]),
            &x,
            &y,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter { .. }));
    }

    #[test]
    fn importances_sum_to_one() {
        let (x, y) = linear_data(100);
        let m = LinearModel::fit_with_params(Algorithm::LinearRegression, &Hyperparameters::new(), &x, &y).unwrap();
        let total: f64 = m.coefficient_importances().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_feature_gets_zero_weight() {
        let (mut x, y) = linear_data(80);
        x.iter_mut().for_each(|r| r[6] = 36.5);
        let m = LinearModel::fit_with_params(Algorithm::LinearRegression, &Hyperparameters::new(), &x, &y).unwrap();
        assert_eq!(m.coefficients()[6], 0.0);
        assert!((m.predict_one(&x[5]) - y[5]).abs() < 1e-8);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            LinearModel::fit(Algorithm::LinearRegression, Penalty::None, true, &[], &[]),
            Err(ModelError::EmptyTrainingSet)
        ));
    }
}
