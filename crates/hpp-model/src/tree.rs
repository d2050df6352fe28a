//! # CART Regression Tree
//!
//! Greedy binary splits minimizing the children's summed squared error.
//! Nodes live in a flat arena grown from an explicit work stack.
//!
//! A node becomes a leaf when any of these hold: it has fewer than
//! `min_samples_split` rows, it is at `max_depth`, its targets are constant,
//! or no threshold leaves `min_samples_leaf` rows on both sides while
//! lowering the squared error.
//!
//! Feature importances are the total squared-error decrease credited to each
//! feature, normalized to sum to 1.

use hpp_core::{Algorithm, FeatureVector, Hyperparameters, N_FEATURES};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::hyper::ParamReader;

/// Growth limits shared by single trees and forests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    /// Maximum depth; `None` grows until another limit applies.
    pub max_depth: Option<usize>,
    /// Minimum rows a node needs to be split.
    pub min_samples_split: usize,
    /// Minimum rows in each child of a split.
    pub min_samples_leaf: usize,
    /// Features examined per split; `None` examines all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

impl TreeParams {
    pub(crate) fn read(p: &mut ParamReader<'_>) -> Result<Self, ModelError> {
        let max_depth = p.opt_usize("max_depth", None)?;
        let min_samples_split = p.usize("min_samples_split", 2)?;
        let min_samples_leaf = p.usize("min_samples_leaf", 1)?;
        p.ensure(max_depth != Some(0), "max_depth", "must be at least 1 or null")?;
        p.ensure(min_samples_split >= 2, "min_samples_split", "must be at least 2")?;
        p.ensure(min_samples_leaf >= 1, "min_samples_leaf", "must be at least 1")?;

        let max_features = match p.raw("max_features") {
            None | Some(hpp_core::ParamValue::None) => None,
            Some(v) => {
                let count = match v {
                    hpp_core::ParamValue::Int(k) if *k >= 1 && (*k as usize) <= N_FEATURES => Some(*k as usize),
                    hpp_core::ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => {
                        Some(((f * N_FEATURES as f64).ceil() as usize).max(1))
                    }
                    _ => None,
                };
                p.ensure(
                    count.is_some(),
                    "max_features",
                    "must be an integer in 1..=8, a fraction in (0, 1], or null",
                )?;
                count
            }
        };

        Ok(Self {
            max_depth,
            min_samples_split,
            min_samples_leaf,
            max_features,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        samples: usize,
    },
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    importances: FeatureVector,
    depth: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    child_sse: f64,
}

impl DecisionTree {
    /// Fit a single tree from a hyperparameter map.
    pub fn fit_with_params(
        params: &Hyperparameters,
        x: &[FeatureVector],
        y: &[f64],
        seed: u64,
    ) -> Result<Self, ModelError> {
        let mut p = ParamReader::new(Algorithm::DecisionTree, params);
        let tree_params = TreeParams::read(&mut p)?;
        p.finish()?;
        if x.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let mut rng = StdRng::seed_from_u64(seed);
        Ok(Self::grow(&tree_params, x, y, (0..x.len()).collect(), &mut rng))
    }

    /// Grow a tree over the rows at `indices`, which may repeat.
    pub(crate) fn grow(
        params: &TreeParams,
        x: &[FeatureVector],
        y: &[f64],
        indices: Vec<usize>,
        rng: &mut StdRng,
    ) -> Self {
        let mut nodes = vec![Node::Leaf { value: 0.0, samples: 0 }];
        let mut gain = [0.0; N_FEATURES];
        let mut depth_reached = 0;
        let mut stack = vec![(0usize, indices, 0usize)];
        let mut scratch = Vec::new();

        while let Some((slot, idx, depth)) = stack.pop() {
            depth_reached = depth_reached.max(depth);
            let n = idx.len();
            let (sum, sum_sq) = idx.iter().fold((0.0, 0.0), |(s, ss), &i| (s + y[i], ss + y[i] * y[i]));
            let mean = sum / n as f64;
            let sse = (sum_sq - sum * sum / n as f64).max(0.0);

            let splittable = n >= params.min_samples_split
                && n >= 2 * params.min_samples_leaf
                && params.max_depth.map_or(true, |d| depth < d)
                && sse > 1e-12;
            let best = if splittable {
                best_split(params, x, y, &idx, sum, sum_sq, sse, rng, &mut scratch)
            } else {
                None
            };

            match best {
                None => nodes[slot] = Node::Leaf { value: mean, samples: n },
                Some(split) => {
                    gain[split.feature] += sse - split.child_sse;
                    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                        idx.into_iter().partition(|&i| x[i][split.feature] <= split.threshold);
                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf { value: 0.0, samples: 0 });
                    nodes.push(Node::Leaf { value: 0.0, samples: 0 });
                    nodes[slot] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                        samples: n,
                    };
                    stack.push((right, right_idx, depth + 1));
                    stack.push((left, left_idx, depth + 1));
                }
            }
        }

        let total: f64 = gain.iter().sum();
        if total > 0.0 {
            gain.iter_mut().for_each(|g| *g /= total);
        }
        Self {
            nodes,
            importances: gain,
            depth: depth_reached,
        }
    }

    /// Predict one row.
    pub fn predict_one(&self, x: &FeatureVector) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => at = if x[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    /// Normalized squared-error decrease per feature.
    pub fn feature_importances(&self) -> &FeatureVector {
        &self.importances
    }

    /// Depth of the deepest leaf; a lone root leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }
}

#[allow(clippy::too_many_arguments)]
fn best_split(
    params: &TreeParams,
    x: &[FeatureVector],
    y: &[f64],
    idx: &[usize],
    sum: f64,
    sum_sq: f64,
    parent_sse: f64,
    rng: &mut StdRng,
    order: &mut Vec<usize>,
) -> Option<BestSplit> {
    let n = idx.len();
    let min_leaf = params.min_samples_leaf;
    let candidates: Vec<usize> = match params.max_features {
        Some(k) if k < N_FEATURES => {
            let mut picked = rand::seq::index::sample(rng, N_FEATURES, k).into_vec();
            picked.sort_unstable();
            picked
        }
        _ => (0..N_FEATURES).collect(),
    };

    let mut best: Option<BestSplit> = None;
    for feature in candidates {
        order.clear();
        order.extend_from_slice(idx);
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let (mut left_sum, mut left_sq) = (0.0, 0.0);
        for pos in 0..n - 1 {
            let yi = y[order[pos]];
            left_sum += yi;
            left_sq += yi * yi;
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let here = x[order[pos]][feature];
            let next = x[order[pos + 1]][feature];
            if next <= here {
                continue;
            }
            let right_sum = sum - left_sum;
            let right_sq = sum_sq - left_sq;
            let child_sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            if best.as_ref().map_or(true, |b| child_sse < b.child_sse) {
                let mut threshold = here + (next - here) / 2.0;
                if threshold >= next {
                    threshold = here;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    child_sse,
                });
            }
        }
    }
    best.filter(|b| b.child_sse < parent_sse)
}
