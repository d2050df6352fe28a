//! k-fold cross-validation.
//!
//! Folds are contiguous and unshuffled: the first `n % k` folds hold one
//! extra row. The split CSVs are already shuffled by the loader.

use hpp_core::{Algorithm, Hyperparameters};
use hpp_data::Dataset;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::metrics::mse;
use crate::regressor::Regressor;

/// Train/validation row indices of one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Rows the model is fitted on.
    pub train: Vec<usize>,
    /// Rows the model is scored on.
    pub validation: Vec<usize>,
}

/// Partition `0..n` into `k` folds.
pub fn kfold(n: usize, k: usize) -> Result<Vec<Fold>, ModelError> {
    if k < 2 || n < k {
        return Err(ModelError::TooFewSamples { samples: n, folds: k });
    }
    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let size = base + usize::from(i < extra);
        let end = start + size;
        folds.push(Fold {
            train: (0..start).chain(end..n).collect(),
            validation: (start..end).collect(),
        });
        start = end;
    }
    Ok(folds)
}

/// Per-fold and aggregate MSE of one hyperparameter assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvScore {
    /// Validation MSE of each fold.
    pub fold_mse: Vec<f64>,
    /// Mean of `fold_mse`; lower is better.
    pub mean_mse: f64,
    /// Population standard deviation of `fold_mse`.
    pub std_mse: f64,
}

/// Fit and score `algorithm` with `params` on every fold of `data`.
pub fn cross_validate(
    algorithm: Algorithm,
    params: &Hyperparameters,
    data: &Dataset,
    k: usize,
    seed: u64,
) -> Result<CvScore, ModelError> {
    let mut fold_mse = Vec::with_capacity(k);
    for fold in kfold(data.len(), k)? {
        let train = data.select(&fold.train);
        let holdout = data.select(&fold.validation);
        let model = Regressor::fit(algorithm, params, train.features(), train.targets(), seed)?;
        let score = mse(holdout.targets(), &model.predict(holdout.features()));
        if !score.is_finite() {
            return Err(ModelError::NonFinite(format!("{algorithm} cross-validation score")));
        }
        fold_mse.push(score);
    }
    let mean_mse = fold_mse.iter().sum::<f64>() / fold_mse.len() as f64;
    let std_mse = (fold_mse.iter().map(|s| (s - mean_mse).powi(2)).sum::<f64>() / fold_mse.len() as f64).sqrt();
    Ok(CvScore {
        fold_mse,
        mean_mse,
        std_mse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn uneven_folds_front_load_extra_rows() {
        let folds = kfold(10, 3).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.validation.len()).collect();
        assert_eq!(sizes, [4, 3, 3]);
        assert_eq!(folds[1].validation, vec![4, 5, 6]);
        assert_eq!(folds[1].train, vec![0, 1, 2, 3, 7, 8, 9]);
    }

    proptest! {
        #[test]
        fn every_row_validated_exactly_once(k in 2usize..12, extra in 0usize..200) {
            let n = k + extra;
            let folds = kfold(n, k).unwrap();
            prop_assert_eq!(folds.len(), k);
            let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.validation.clone()).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
            for f in &folds {
                prop_assert_eq!(f.train.len() + f.validation.len(), n);
                prop_assert!(f.validation.iter().all(|i| !f.train.contains(i)));
            }
        }
    }

    #[test]
    fn too_few_rows_is_rejected() {
        assert!(matches!(kfold(2, 3), Err(ModelError::TooFewSamples { samples: 2, folds: 3 })));
        assert!(kfold(10, 1).is_err());
    }

    #[test]
    fn exact_linear_relation_scores_near_zero() {
        let features = (0..30)
            .map(|i| {
                let t = i as f64;
                [t, (t * 0.3).sin(), 5.0 + t % 4.0, 1.0, 100.0 + t % 7.0, 2.0, 34.0, -118.0]
            })
            .collect::<Vec<_>>();
        let targets = features.iter().map(|r| 0.2 * r[0] + 1.0).collect();
        let data = Dataset::new(features, targets).unwrap();
        let score = cross_validate(Algorithm::LinearRegression, &Hyperparameters::new(), &data, 5, 0).unwrap();
        assert_eq!(score.fold_mse.len(), 5);
        assert!(score.mean_mse < 1e-12, "{score:?}");
    }
}
