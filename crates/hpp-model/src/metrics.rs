//! Regression error metrics.

use serde::{Deserialize, Serialize};

/// Mean squared error.
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)), actual.len())
}

/// Root mean squared error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Mean absolute error.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()), actual.len())
}

/// Coefficient of determination. A constant target scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len();
    if n == 0 {
        return 0.0;
    }
    let mean_actual = actual.iter().sum::<f64>() / n as f64;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Mean absolute percentage error, in percent. Targets near zero are
/// clamped to machine epsilon in the denominator.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    100.0
        * mean(
            actual
                .iter()
                .zip(predicted)
                .map(|(a, p)| (a - p).abs() / a.abs().max(f64::EPSILON)),
            actual.len(),
        )
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        values.sum::<f64>() / n as f64
    }
}

/// RMSE, MAE and R² of one prediction set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Coefficient of determination.
    pub r2: f64,
}

impl RegressionMetrics {
    /// Score `predicted` against `actual`.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        Self {
            rmse: rmse(actual, predicted),
            mae: mae(actual, predicted),
            r2: r2(actual, predicted),
        }
    }

    /// Named entries with a prefix, e.g. `val_rmse`.
    pub fn prefixed(&self, prefix: &str) -> [(String, f64); 3] {
        [
            (format!("{prefix}_rmse"), self.rmse),
            (format!("{prefix}_mae"), self.mae),
            (format!("{prefix}_r2"), self.r2),
        ]
    }
}

/// Distribution of `actual − predicted`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    /// Mean residual; near zero for an unbiased model.
    pub mean_residual: f64,
    /// Population standard deviation of residuals.
    pub std_residual: f64,
    /// Largest absolute residual.
    pub max_residual: f64,
    /// Median absolute residual.
    pub median_abs_residual: f64,
}

impl ResidualStats {
    /// Summarize residuals of `predicted` against `actual`.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        let residuals = residuals(actual, predicted);
        let n = residuals.len();
        let mean_residual = mean(residuals.iter().copied(), n);
        let std_residual = mean(residuals.iter().map(|r| (r - mean_residual).powi(2)), n).sqrt();
        let mut abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
        abs.sort_by(f64::total_cmp);
        let median_abs_residual = match n {
            0 => 0.0,
            _ if n % 2 == 1 => abs[n / 2],
            _ => (abs[n / 2 - 1] + abs[n / 2]) / 2.0,
        };
        Self {
            mean_residual,
            std_residual,
            max_residual: abs.last().copied().unwrap_or(0.0),
            median_abs_residual,
        }
    }
}

/// `actual − predicted`, elementwise.
pub fn residuals(actual: &[f64], predicted: &[f64]) -> Vec<f64> {
    actual.iter().zip(predicted).map(|(a, p)| a - p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTUAL: [f64; 4] = [3.0, -0.5, 2.0, 7.0];
    const PREDICTED: [f64; 4] = [2.5, 0.0, 2.0, 8.0];

    #[test]
    fn reference_values() {
        assert!((mse(&ACTUAL, &PREDICTED) - 0.375).abs() < 1e-12);
        assert!((mae(&ACTUAL, &PREDICTED) - 0.5).abs() < 1e-12);
        assert!((r2(&ACTUAL, &PREDICTED) - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn perfect_prediction() {
        let m = RegressionMetrics::compute(&ACTUAL, &ACTUAL);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(mape(&ACTUAL, &ACTUAL), 0.0);
    }

    #[test]
    fn constant_target_r2() {
        assert_eq!(r2(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2(&[2.0, 2.0], &[1.0, 3.0]), 0.0);
    }

    #[test]
    fn mape_in_percent() {
        assert!((mape(&[1.0, 2.0], &[1.1, 1.8]) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn residual_summary() {
        let s = ResidualStats::compute(&ACTUAL, &PREDICTED);
        assert!((s.mean_residual - (-0.25)).abs() < 1e-12);
        assert_eq!(s.max_residual, 1.0);
        assert_eq!(s.median_abs_residual, 0.5);
    }

    #[test]
    fn prefixed_names() {
        let m = RegressionMetrics { rmse: 1.0, mae: 2.0, r2: 0.5 };
        let names: Vec<String> = m.prefixed("val").into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["val_rmse", "val_mae", "val_r2"]);
    }

    #[test]
    fn empty_inputs_are_zero() {
        assert_eq!(mse(&[], &[]), 0.0);
        assert_eq!(ResidualStats::compute(&[], &[]).max_residual, 0.0);
    }
}
