//! In-memory dataset: a feature matrix and its aligned targets.

use hpp_core::FeatureVector;

use crate::error::DataError;

/// Rows of covariates with one regression target each.
///
/// Feature rows are stored in [`hpp_core::FEATURE_NAMES`] order. Once built, a
/// dataset is never mutated; splits and folds are produced by [`Dataset::select`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    features: Vec<FeatureVector>,
    targets: Vec<f64>,
}

impl Dataset {
    /// Pair a feature matrix with its targets.
    pub fn new(features: Vec<FeatureVector>, targets: Vec<f64>) -> Result<Self, DataError> {
        if features.len() != targets.len() {
            return Err(DataError::LengthMismatch {
                features: features.len(),
                targets: targets.len(),
            });
        }
        Ok(Self { features, targets })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The feature matrix.
    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    /// The targets, aligned with [`Dataset::features`].
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Rows as `(features, target)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&FeatureVector, f64)> + '_ {
        self.features.iter().zip(self.targets.iter().copied())
    }

    /// A new dataset made of the rows at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// Values of column `idx` across all rows.
    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.features.iter().map(|row| row[idx]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Dataset {
        let features = (0..4).map(|i| [i as f64; 8]).collect();
        Dataset::new(features, vec![0.0, 10.0, 20.0, 30.0]).unwrap()
    }

    #[test]
    fn rejects_misaligned_targets() {
        let err = Dataset::new(vec![[0.0; 8]], vec![]).unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { features: 1, targets: 0 }));
    }

    #[test]
    fn select_preserves_requested_order() {
        let ds = tiny().select(&[3, 1]);
        assert_eq!(ds.targets(), &[30.0, 10.0]);
        assert_eq!(ds.features()[0][0], 3.0);
    }

    #[test]
    fn column_extracts_values() {
        assert_eq!(tiny().column(5), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(tiny().rows().count(), 4);
    }
}
