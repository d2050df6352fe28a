//! Deterministic train/validation/test partitioning.
//!
//! Row indices are shuffled once with a seeded generator. The first
//! `ceil(n * test_size)` shuffled rows form the test split; of the remaining
//! rows, the first `ceil(m * validation_size)` form the validation split and
//! the rest are the training split. The same input and seed always produce
//! the same three splits.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::Dataset;
use crate::error::DataError;

/// Which partition a file or dataset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    /// Training rows.
    Train,
    /// Validation rows, used for model selection.
    Validation,
    /// Held-out rows, used only for final evaluation.
    Test,
}

impl SplitKind {
    /// Every partition, in write order.
    pub const ALL: [SplitKind; 3] = [Self::Train, Self::Validation, Self::Test];

    /// File name of the partition's CSV.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Train => "train.csv",
            Self::Validation => "validation.csv",
            Self::Test => "test.csv",
        }
    }

    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }
}

/// The three partitions of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Splits {
    /// Training rows.
    pub train: Dataset,
    /// Validation rows.
    pub validation: Dataset,
    /// Test rows.
    pub test: Dataset,
}

impl Splits {
    /// The partition of the given kind.
    pub fn get(&self, kind: SplitKind) -> &Dataset {
        match kind {
            SplitKind::Train => &self.train,
            SplitKind::Validation => &self.validation,
            SplitKind::Test => &self.test,
        }
    }
}

/// Partition `dataset` with the given fractions and seed.
///
/// Fails when any partition would be empty.
pub fn split_dataset(
    dataset: &Dataset,
    test_size: f64,
    validation_size: f64,
    seed: u64,
) -> Result<Splits, DataError> {
    let n = dataset.len();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = holdout_count(n, test_size);
    let (test_idx, rest) = indices.split_at(n_test.min(n));
    let n_val = holdout_count(rest.len(), validation_size);
    let (val_idx, train_idx) = rest.split_at(n_val.min(rest.len()));

    if test_idx.is_empty() || val_idx.is_empty() || train_idx.is_empty() {
        return Err(DataError::TooSmall(format!(
            "{n} rows cannot be split into non-empty train/validation/test partitions"
        )));
    }

    Ok(Splits {
        train: dataset.select(train_idx),
        validation: dataset.select(val_idx),
        test: dataset.select(test_idx),
    })
}

fn holdout_count(n: usize, fraction: f64) -> usize {
    (n as f64 * fraction).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn numbered(n: usize) -> Dataset {
        let features = (0..n).map(|i| [i as f64; 8]).collect();
        let targets = (0..n).map(|i| i as f64).collect();
        Dataset::new(features, targets).unwrap()
    }

    #[test]
    fn sizes_follow_ceil_rule() {
        let s = split_dataset(&numbered(1000), 0.2, 0.2, 42).unwrap();
        assert_eq!(s.test.len(), 200);
        assert_eq!(s.validation.len(), 160);
        assert_eq!(s.train.len(), 640);
    }

    #[test]
    fn same_seed_same_split() {
        let ds = numbered(257);
        assert_eq!(
            split_dataset(&ds, 0.2, 0.2, 7).unwrap(),
            split_dataset(&ds, 0.2, 0.2, 7).unwrap()
        );
    }

    #[test]
    fn different_seed_different_split() {
        let ds = numbered(257);
        let a = split_dataset(&ds, 0.2, 0.2, 1).unwrap();
        let b = split_dataset(&ds, 0.2, 0.2, 2).unwrap();
        assert_ne!(a.test.targets(), b.test.targets());
    }

    #[test]
    fn too_small_is_rejected() {
        let err = split_dataset(&numbered(2), 0.2, 0.2, 42).unwrap_err();
        assert!(matches!(err, DataError::TooSmall(_)));
    }

    #[test]
    fn kind_file_names() {
        let names: Vec<_> = SplitKind::ALL.iter().map(SplitKind::file_name).collect();
        assert_eq!(names, ["train.csv", "validation.csv", "test.csv"]);
    }

    proptest! {
        #[test]
        fn partitions_cover_every_row_once(n in 3usize..400, seed in any::<u64>()) {
            let s = split_dataset(&numbered(n), 0.2, 0.2, seed).unwrap();
            let mut seen: Vec<usize> = s.train.targets().iter()
                .chain(s.validation.targets())
                .chain(s.test.targets())
                .map(|t| *t as usize)
                .collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }
    }
}
