//! # Hyperparameter Search
//!
//! Expands a [`ParamGrid`] into candidates, cross-validates each, and refits
//! the winner on the full training split.
//!
//! Grid expansion walks keys in sorted order with the last key varying
//! fastest. Randomized search draws `n_iter` distinct grid points with the
//! training seed. A candidate whose fit fails is recorded and skipped; the
//! search fails only if every candidate fails.

use hpp_core::{Algorithm, Hyperparameters, ParamGrid, SearchStrategy};
use hpp_data::Dataset;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::cv::{cross_validate, CvScore};
use crate::error::ModelError;
use crate::regressor::Regressor;

/// Every combination of grid values.
pub fn expand_grid(grid: &ParamGrid) -> Vec<Hyperparameters> {
    let mut candidates = vec![Hyperparameters::new()];
    for (key, values) in grid {
        let mut next = Vec::with_capacity(candidates.len() * values.len());
        for base in &candidates {
            for value in values {
                let mut c = base.clone();
                c.insert(key.clone(), value.clone());
                next.push(c);
            }
        }
        candidates = next;
    }
    candidates
}

/// The candidates `strategy` evaluates.
pub fn candidates(grid: &ParamGrid, strategy: &SearchStrategy, seed: u64) -> Vec<Hyperparameters> {
    let all = expand_grid(grid);
    match strategy {
        SearchStrategy::Grid => all,
        SearchStrategy::Random { n_iter } if *n_iter < all.len() => {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = rand::seq::index::sample(&mut rng, all.len(), *n_iter);
            picked.into_iter().map(|i| all[i].clone()).collect()
        }
        SearchStrategy::Random { .. } => all,
    }
}

/// Outcome of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// The assignment evaluated.
    pub params: Hyperparameters,
    /// Its cross-validation score, when fitting succeeded.
    pub score: Option<CvScore>,
    /// Why fitting failed, when it did.
    pub error: Option<String>,
    /// 1 for the best candidate; absent for failed ones.
    pub rank: Option<usize>,
}

/// Result of a completed search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Winning assignment.
    pub best_params: Hyperparameters,
    /// Winner's mean cross-validated MSE.
    pub best_mse: f64,
    /// Every candidate, in evaluation order.
    pub results: Vec<CandidateResult>,
    /// Winner refitted on all training rows.
    pub model: Regressor,
}

impl SearchOutcome {
    /// Winner's cross-validated RMSE.
    pub fn best_rmse(&self) -> f64 {
        self.best_mse.sqrt()
    }
}

/// Search `grid` for `algorithm` on `train`.
pub fn search(
    algorithm: Algorithm,
    grid: &ParamGrid,
    strategy: &SearchStrategy,
    folds: usize,
    train: &Dataset,
    seed: u64,
) -> Result<SearchOutcome, ModelError> {
    let pool = candidates(grid, strategy, seed);
    if pool.is_empty() {
        return Err(ModelError::NoCandidates(algorithm));
    }
    tracing::info!(%algorithm, candidates = pool.len(), folds, "starting hyperparameter search");

    let mut results = Vec::with_capacity(pool.len());
    let mut last_error = None;
    for params in pool {
        match cross_validate(algorithm, &params, train, folds, seed) {
            Ok(score) => {
                tracing::debug!(%algorithm, ?params, mean_mse = score.mean_mse, "candidate scored");
                results.push(CandidateResult {
                    params,
                    score: Some(score),
                    error: None,
                    rank: None,
                });
            }
            Err(e) => {
                tracing::warn!(%algorithm, ?params, error = %e, "candidate failed");
                results.push(CandidateResult {
                    params,
                    score: None,
                    error: Some(e.to_string()),
                    rank: None,
                });
                last_error = Some(e);
            }
        }
    }

    let mut order: Vec<usize> = (0..results.len()).filter(|&i| results[i].score.is_some()).collect();
    let mean_of = |i: usize| results[i].score.as_ref().map_or(f64::INFINITY, |s| s.mean_mse);
    // stable sort keeps the earlier candidate on ties
    order.sort_by(|&a, &b| mean_of(a).total_cmp(&mean_of(b)));
    let Some(&best_idx) = order.first() else {
        return Err(last_error.unwrap_or(ModelError::NoCandidates(algorithm)));
    };
    let best_mse = mean_of(best_idx);
    for (rank, &i) in order.iter().enumerate() {
        results[i].rank = Some(rank + 1);
    }

    let best_params = results[best_idx].params.clone();
    let model = Regressor::fit(algorithm, &best_params, train.features(), train.targets(), seed)?;
    tracing::info!(%algorithm, ?best_params, cv_rmse = best_mse.sqrt(), "search complete");

    Ok(SearchOutcome {
        best_params,
        best_mse,
        results,
        model,
    })
}
