//! Per-feature standardization.

use hpp_core::{FeatureVector, N_FEATURES};
use serde::{Deserialize, Serialize};

/// Centers each feature on its training mean and divides by its training
/// standard deviation. A constant feature keeps a scale of 1 so it maps to 0
/// rather than to NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: FeatureVector,
    scale: FeatureVector,
}

impl StandardScaler {
    /// Learn means and population standard deviations from `rows`.
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = [0.0; N_FEATURES];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut scale = [0.0; N_FEATURES];
        for row in rows {
            for j in 0..N_FEATURES {
                scale[j] += (row[j] - mean[j]).powi(2);
            }
        }
        for s in scale.iter_mut() {
            *s = (*s / n).sqrt();
            if *s < 1e-12 {
                *s = 1.0;
            }
        }
        Self { mean, scale }
    }

    /// Standardize one row.
    pub fn transform(&self, row: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; N_FEATURES];
        for j in 0..N_FEATURES {
            out[j] = (row[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    /// Standardize many rows.
    pub fn transform_all(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    /// Learned means.
    pub fn mean(&self) -> &FeatureVector {
        &self.mean
    }

    /// Learned scales.
    pub fn scale(&self) -> &FeatureVector {
        &self.scale
    }
}
