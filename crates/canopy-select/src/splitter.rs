//! Train/test splitting and cross-validation fold generation.

use std::fmt;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::SelectError;

/// Randomly partition `0..n_samples` into train and test indices.
///
/// The indices are shuffled with a ChaCha8 RNG seeded by `seed`; the first
/// `ceil(test_fraction * n_samples)` shuffled indices form the test set.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SelectError::InvalidTestFraction`] | fraction is not finite or outside (0, 1) |
/// | [`SelectError::EmptyPartition`] | either side of the split would be empty |
pub fn train_test_split(
    n_samples: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), SelectError> {
    if !test_fraction.is_finite() || test_fraction <= 0.0 || test_fraction >= 1.0 {
        return Err(SelectError::InvalidTestFraction {
            fraction: test_fraction,
        });
    }
    let n_test = (test_fraction * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(SelectError::EmptyPartition {
            n_samples,
            fraction: test_fraction,
        });
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}

/// Cross-validation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossValidation {
    /// One fold per sample.
    LeaveOneOut,
    /// Shuffled k-fold.
    KFold {
        /// Number of folds (at least 2).
        n_folds: usize,
        /// Seed for the shuffle.
        seed: u64,
    },
}

impl CrossValidation {
    /// Create a shuffled k-fold strategy.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn k_fold(n_folds: usize, seed: u64) -> Result<Self, SelectError> {
        if n_folds < 2 {
            return Err(SelectError::InvalidFoldCount { n_folds });
        }
        Ok(CrossValidation::KFold { n_folds, seed })
    }

    /// Human-readable method label: `"LOO"` or `"<k>-fold"`.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// Number of folds this strategy produces for `n_samples` samples.
    #[must_use]
    pub fn n_splits(&self, n_samples: usize) -> usize {
        match self {
            CrossValidation::LeaveOneOut => n_samples,
            CrossValidation::KFold { n_folds, .. } => *n_folds,
        }
    }

    /// Generate the held-out test indices of every fold.
    ///
    /// Folds are disjoint and together cover `0..n_samples` exactly once.
    /// For k-fold, the indices are shuffled and the first `n_samples % k`
    /// folds receive one extra sample.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::TooFewSamplesForFolds`] when there are fewer
    /// samples than folds (or fewer than 2 samples for leave-one-out).
    pub fn folds(&self, n_samples: usize) -> Result<Vec<Vec<usize>>, SelectError> {
        match *self {
            CrossValidation::LeaveOneOut => {
                if n_samples < 2 {
                    return Err(SelectError::TooFewSamplesForFolds {
                        n_samples,
                        n_folds: n_samples,
                    });
                }
                Ok((0..n_samples).map(|i| vec![i]).collect())
            }
            CrossValidation::KFold { n_folds, seed } => {
                if n_samples < n_folds {
                    return Err(SelectError::TooFewSamplesForFolds { n_samples, n_folds });
                }
                let mut indices: Vec<usize> = (0..n_samples).collect();
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                indices.shuffle(&mut rng);

                let base = n_samples / n_folds;
                let extra = n_samples % n_folds;
                let mut folds = Vec::with_capacity(n_folds);
                let mut start = 0;
                for fold in 0..n_folds {
                    let size = base + usize::from(fold < extra);
                    folds.push(indices[start..start + size].to_vec());
                    start += size;
                }
                Ok(folds)
            }
        }
    }
}

impl fmt::Display for CrossValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossValidation::LeaveOneOut => f.write_str("LOO"),
            CrossValidation::KFold { n_folds, .. } => write!(f, "{n_folds}-fold"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sizes_and_disjointness() {
        let (train, test) = train_test_split(10, 0.25, 1).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);
        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_seeded() {
        assert_eq!(train_test_split(50, 0.3, 7).unwrap(), train_test_split(50, 0.3, 7).unwrap());
        assert_ne!(train_test_split(50, 0.3, 7).unwrap(), train_test_split(50, 0.3, 8).unwrap());
    }

    #[test]
    fn split_rejects_bad_fractions() {
        for fraction in [0.0, 1.0, -0.2, 1.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                train_test_split(10, fraction, 1),
                Err(SelectError::InvalidTestFraction { .. })
            ));
        }
        assert!(matches!(
            train_test_split(1, 0.5, 1),
            Err(SelectError::EmptyPartition { .. })
        ));
    }

    #[test]
    fn k_fold_partitions_samples() {
        let cv = CrossValidation::k_fold(3, 42).unwrap();
        let folds = cv.folds(10).unwrap();
        assert_eq!(
            folds.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![4, 3, 3]
        );
        let mut all: Vec<usize> = folds.concat();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn leave_one_out_folds() {
        let folds = CrossValidation::LeaveOneOut.folds(4).unwrap();
        assert_eq!(folds, vec![vec![0], vec![1], vec![2], vec![3]]);
        assert_eq!(CrossValidation::LeaveOneOut.n_splits(4), 4);
    }

    #[test]
    fn labels() {
        assert_eq!(CrossValidation::LeaveOneOut.label(), "LOO");
        assert_eq!(CrossValidation::k_fold(5, 0).unwrap().label(), "5-fold");
    }

    #[test]
    fn invalid_fold_counts() {
        assert!(matches!(
            CrossValidation::k_fold(1, 0),
            Err(SelectError::InvalidFoldCount { n_folds: 1 })
        ));
        assert!(matches!(
            CrossValidation::k_fold(5, 0).unwrap().folds(3),
            Err(SelectError::TooFewSamplesForFolds { n_samples: 3, n_folds: 5 })
        ));
        assert!(CrossValidation::LeaveOneOut.folds(1).is_err());
    }
}
