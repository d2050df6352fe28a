//! # Random Forest
//!
//! Bagged regression trees. Tree `t` draws its bootstrap sample and its
//! per-split feature subsets from a generator seeded with `seed + t`, so the
//! fitted forest is identical whatever the size of the rayon pool.

use hpp_core::{Algorithm, FeatureVector, Hyperparameters, N_FEATURES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::hyper::ParamReader;
use crate::tree::{DecisionTree, TreeParams};

/// Settings for [`RandomForest::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    /// Number of trees.
    pub n_estimators: usize,
    /// Limits applied to every tree.
    pub tree: TreeParams,
    /// Whether each tree sees a bootstrap resample instead of every row.
    pub bootstrap: bool,
}

/// A fitted forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    importances: FeatureVector,
}

impl RandomForest {
    /// Fit from a hyperparameter map.
    pub fn fit_with_params(
        params: &Hyperparameters,
        x: &[FeatureVector],
        y: &[f64],
        seed: u64,
    ) -> Result<Self, ModelError> {
        let mut p = ParamReader::new(Algorithm::RandomForest, params);
        let n_estimators = p.usize("n_estimators", 100)?;
        let bootstrap = p.bool("bootstrap", true)?;
        let tree = TreeParams::read(&mut p)?;
        p.ensure(n_estimators >= 1, "n_estimators", "must be at least 1")?;
        p.finish()?;
        Self::fit(
            &ForestParams {
                n_estimators,
                tree,
                bootstrap,
            },
            x,
            y,
            seed,
        )
    }

    /// Fit `params.n_estimators` trees on the global rayon pool.
    pub fn fit(params: &ForestParams, x: &[FeatureVector], y: &[f64], seed: u64) -> Result<Self, ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let n = x.len();
        let n_trees = params.n_estimators;
        if n_trees == 0 {
            return Err(ModelError::InvalidParameter {
                algorithm: Algorithm::RandomForest,
                name: "n_estimators".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let build = |t: usize| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
            let indices = if params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            DecisionTree::grow(&params.tree, x, y, indices, &mut rng)
        };

        let trees: Vec<DecisionTree> = (0..n_trees).into_par_iter().map(build).collect();

        let mut importances = [0.0; N_FEATURES];
        for tree in &trees {
            for (acc, v) in importances.iter_mut().zip(tree.feature_importances()) {
                *acc += v;
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        Ok(Self { trees, importances })
    }

    /// Mean of the trees' predictions.
    pub fn predict_one(&self, x: &FeatureVector) -> f64 {
        self.trees.iter().map(|t| t.predict_one(x)).sum::<f64>() / self.trees.len() as f64
    }

    /// Mean tree importance, renormalized.
    pub fn feature_importances(&self) -> &FeatureVector {
        &self.importances
    }

    /// Number of fitted trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
