//! Cross-validation type parsing and hyperparameter search settings.

use std::fmt;
use std::str::FromStr;

use canopy_forest::MaxFeatures;
use canopy_select::{CrossValidation, SearchSpace, SelectError};

use crate::error::ModelError;

/// Cross-validation strategy named by the user.
///
/// Parses from `"loo"` (any case) or an integer fold count of at least 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossValidationType {
    /// Leave-one-out.
    #[default]
    LeaveOneOut,
    /// Shuffled k-fold with this many folds.
    KFold(usize),
}

impl CrossValidationType {
    /// Build the splitter, seeding k-fold shuffles with `seed`.
    #[must_use]
    pub fn strategy(self, seed: u64) -> CrossValidation {
        match self {
            CrossValidationType::LeaveOneOut => CrossValidation::LeaveOneOut,
            CrossValidationType::KFold(n_folds) => CrossValidation::KFold { n_folds, seed },
        }
    }
}

impl FromStr for CrossValidationType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("loo") {
            return Ok(CrossValidationType::LeaveOneOut);
        }
        match trimmed.parse::<usize>() {
            Ok(n_folds) if n_folds >= 2 => Ok(CrossValidationType::KFold(n_folds)),
            _ => Err(ModelError::InvalidCrossValidation {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CrossValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossValidationType::LeaveOneOut => f.write_str("loo"),
            CrossValidationType::KFold(n) => write!(f, "{n}"),
        }
    }
}

/// Grid definition for [`RandomForestModel::search_hyperparameters`](crate::RandomForestModel::search_hyperparameters).
///
/// Tree counts and depth limits are given as `(start, stop, num)` linear
/// spacings; the depth grid always ends with the unbounded option.
///
/// # Defaults
///
/// | Parameter           | Default              |
/// |---------------------|----------------------|
/// | `estimators`        | `(200, 1000, 100)`   |
/// | `max_features`      | `[All, Sqrt]`        |
/// | `max_depth`         | `(10, 110, 11)`      |
/// | `min_samples_split` | `[2, 5, 10, 20]`     |
/// | `min_samples_leaf`  | `[1, 2, 4, 6]`       |
/// | `bootstrap`         | `[true, false]`      |
/// | `n_iter`            | 100                  |
#[derive(Debug, Clone, PartialEq)]
pub struct HyperparameterSearch {
    pub(crate) estimators: (usize, usize, usize),
    pub(crate) max_features: Vec<MaxFeatures>,
    pub(crate) max_depth: (usize, usize, usize),
    pub(crate) min_samples_split: Vec<usize>,
    pub(crate) min_samples_leaf: Vec<usize>,
    pub(crate) bootstrap: Vec<bool>,
    pub(crate) n_iter: usize,
}

impl HyperparameterSearch {
    /// Create search settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            estimators: (200, 1000, 100),
            max_features: vec![MaxFeatures::All, MaxFeatures::Sqrt],
            max_depth: (10, 110, 11),
            min_samples_split: vec![2, 5, 10, 20],
            min_samples_leaf: vec![1, 2, 4, 6],
            bootstrap: vec![true, false],
            n_iter: 100,
        }
    }

    /// Set the tree-count spacing `(start, stop, num)`.
    #[must_use]
    pub fn with_estimators(mut self, start: usize, stop: usize, num: usize) -> Self {
        self.estimators = (start, stop, num);
        self
    }

    /// Set the candidate max_features strategies.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Vec<MaxFeatures>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the depth spacing `(start, stop, num)`.
    #[must_use]
    pub fn with_max_depth(mut self, start: usize, stop: usize, num: usize) -> Self {
        self.max_depth = (start, stop, num);
        self
    }

    /// Set the candidate min_samples_split values.
    #[must_use]
    pub fn with_min_samples_split(mut self, values: Vec<usize>) -> Self {
        self.min_samples_split = values;
        self
    }

    /// Set the candidate min_samples_leaf values.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, values: Vec<usize>) -> Self {
        self.min_samples_leaf = values;
        self
    }

    /// Set the candidate bootstrap flags.
    #[must_use]
    pub fn with_bootstrap(mut self, values: Vec<bool>) -> Self {
        self.bootstrap = values;
        self
    }

    /// Set the number of sampled grid points.
    #[must_use]
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Return the number of sampled grid points.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Expand the settings into a concrete grid.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidLinspace`] when a spacing has zero points.
    pub fn to_space(&self) -> Result<SearchSpace, SelectError> {
        let (e_start, e_stop, e_num) = self.estimators;
        let (d_start, d_stop, d_num) = self.max_depth;
        Ok(SearchSpace::new()
            .with_n_estimators(SearchSpace::estimator_grid(e_start, e_stop, e_num)?)
            .with_max_features(self.max_features.clone())
            .with_max_depth(SearchSpace::depth_grid(d_start, d_stop, d_num)?)
            .with_min_samples_split(self.min_samples_split.clone())
            .with_min_samples_leaf(self.min_samples_leaf.clone())
            .with_bootstrap(self.bootstrap.clone()))
    }
}

impl Default for HyperparameterSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loo_any_case() {
        for s in ["loo", "LOO", "Loo", " loo "] {
            assert_eq!(s.parse::<CrossValidationType>().unwrap(), CrossValidationType::LeaveOneOut);
        }
    }

    #[test]
    fn parses_fold_counts() {
        assert_eq!("5".parse::<CrossValidationType>().unwrap(), CrossValidationType::KFold(5));
        assert_eq!("2".parse::<CrossValidationType>().unwrap(), CrossValidationType::KFold(2));
    }

    #[test]
    fn rejects_invalid_specifiers() {
        for s in ["abc", "0", "1", "-3", "2.5", ""] {
            assert!(
                matches!(
                    s.parse::<CrossValidationType>(),
                    Err(ModelError::InvalidCrossValidation { .. })
                ),
                "{s:?} should be rejected"
            );
        }
    }

    #[test]
    fn strategy_labels() {
        assert_eq!(CrossValidationType::LeaveOneOut.strategy(1).label(), "LOO");
        assert_eq!(CrossValidationType::KFold(4).strategy(1).label(), "4-fold");
    }

    #[test]
    fn default_search_space() {
        let space = HyperparameterSearch::new().to_space().unwrap();
        assert_eq!(space.n_estimators().len(), 100);
        assert_eq!(space.max_depth().len(), 12);
        assert_eq!(space.max_depth().last(), Some(&None));
        assert_eq!(space.bootstrap(), &[true, false]);
    }

    #[test]
    fn zero_point_spacing_rejected() {
        let err = HyperparameterSearch::new()
            .with_estimators(10, 20, 0)
            .to_space()
            .unwrap_err();
        assert!(matches!(err, SelectError::InvalidLinspace { num: 0 }));
    }
}
