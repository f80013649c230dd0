//! Configuration builder for random forest training.

use std::fmt;
use std::str::FromStr;

use crate::error::ForestError;
use crate::result::RandomForestResult;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// All features (no subsampling). This is the regression "auto" mode.
    All,
    /// Square root of total features.
    Sqrt,
    /// Log base 2 of total features.
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete feature count for a dataset of `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMaxFeatures`] when the resolved count is
    /// zero or larger than `n_features`.
    pub fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let resolved = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor().max(1.0) as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor().max(1.0) as usize,
            MaxFeatures::Fraction(f) if f > 0.0 && f <= 1.0 => {
                ((n_features as f64 * f).floor() as usize).max(1)
            }
            MaxFeatures::Fraction(_) => 0,
            MaxFeatures::Fixed(n) => n,
        };
        if resolved == 0 || resolved > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::All => f.write_str("auto"),
            MaxFeatures::Sqrt => f.write_str("sqrt"),
            MaxFeatures::Log2 => f.write_str("log2"),
            MaxFeatures::Fraction(v) => write!(f, "{v}"),
            MaxFeatures::Fixed(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for MaxFeatures {
    type Err = ForestError;

    /// Parse `auto`/`all`, `sqrt`, `log2`, an integer count, or a fraction.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "auto" | "all" | "none" => return Ok(MaxFeatures::All),
            "sqrt" => return Ok(MaxFeatures::Sqrt),
            "log2" => return Ok(MaxFeatures::Log2),
            _ => {}
        }
        if let Ok(n) = trimmed.parse::<usize>() {
            return Ok(MaxFeatures::Fixed(n));
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f > 0.0 && f <= 1.0 => Ok(MaxFeatures::Fraction(f)),
            _ => Err(ForestError::UnknownMaxFeatures {
                value: s.to_string(),
            }),
        }
    }
}

/// Whether to compute out-of-bag evaluation during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Compute OOB R² and RMSE.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Configuration for random forest regression.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter            | Default     |
/// |----------------------|-------------|
/// | `max_features`       | `All`       |
/// | `max_depth`          | `None`      |
/// | `min_samples_split`  | 2           |
/// | `min_samples_leaf`   | 1           |
/// | `bootstrap`          | `true`      |
/// | `seed`               | 42          |
/// | `oob_mode`           | `Disabled`  |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) bootstrap: bool,
    pub(crate) seed: u64,
    pub(crate) oob_mode: OobMode,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::All,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
            oob_mode: OobMode::Disabled,
        })
    }

    // --- Setters ---

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Draw a bootstrap sample per tree (`true`) or train every tree on all samples.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return whether trees are trained on bootstrap samples.
    #[must_use]
    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Train a random forest regressor on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]` is row-major.
    /// `targets[sample_idx]` is the continuous response.
    /// `feature_names` names each feature column.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                              |
    /// |-----------------------------------------|---------------------------------------------------|
    /// | [`ForestError::EmptyDataset`]           | `features` is empty                               |
    /// | [`ForestError::ZeroFeatures`]           | rows have zero feature columns                    |
    /// | [`ForestError::TargetLengthMismatch`]   | `targets.len() != features.len()`                 |
    /// | [`ForestError::FeatureNameMismatch`]    | `feature_names.len()` differs from the row width  |
    /// | [`ForestError::FeatureCountMismatch`]   | rows have inconsistent lengths                    |
    /// | [`ForestError::NonFiniteValue`]         | any feature value is NaN or infinite              |
    /// | [`ForestError::NonFiniteTarget`]        | any target is NaN or infinite                     |
    /// | [`ForestError::InvalidMaxFeatures`]     | resolved max_features is outside [1, n_features]  |
    /// | [`ForestError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                          |
    /// | [`ForestError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                           |
    /// | [`ForestError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                            |
    /// | [`ForestError::OobRequiresBootstrap`]   | OOB enabled with bootstrap disabled               |
    /// | [`ForestError::OobEvaluationFailed`]    | OOB enabled but no sample has any OOB tree        |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<RandomForestResult, ForestError> {
        crate::forest::train(self, features, targets, feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RandomForestConfig::new(100).unwrap();
        assert_eq!(config.n_trees(), 100);
        assert_eq!(config.max_features(), MaxFeatures::All);
        assert_eq!(config.max_depth(), None);
        assert_eq!(config.min_samples_split(), 2);
        assert_eq!(config.min_samples_leaf(), 1);
        assert!(config.bootstrap());
        assert_eq!(config.oob_mode(), OobMode::Disabled);
    }

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            RandomForestConfig::new(0),
            Err(ForestError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn resolve_max_features() {
        assert_eq!(MaxFeatures::All.resolve(10).unwrap(), 10);
        assert_eq!(MaxFeatures::Sqrt.resolve(10).unwrap(), 3);
        assert_eq!(MaxFeatures::Log2.resolve(10).unwrap(), 3);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(10).unwrap(), 5);
        assert_eq!(MaxFeatures::Fixed(4).resolve(10).unwrap(), 4);
        assert_eq!(MaxFeatures::Sqrt.resolve(1).unwrap(), 1);
        assert!(MaxFeatures::Fixed(11).resolve(10).is_err());
        assert!(MaxFeatures::Fixed(0).resolve(10).is_err());
        assert!(MaxFeatures::Fraction(1.5).resolve(10).is_err());
    }

    #[test]
    fn parse_max_features() {
        assert_eq!("auto".parse::<MaxFeatures>().unwrap(), MaxFeatures::All);
        assert_eq!("SQRT".parse::<MaxFeatures>().unwrap(), MaxFeatures::Sqrt);
        assert_eq!("log2".parse::<MaxFeatures>().unwrap(), MaxFeatures::Log2);
        assert_eq!("3".parse::<MaxFeatures>().unwrap(), MaxFeatures::Fixed(3));
        assert_eq!("0.25".parse::<MaxFeatures>().unwrap(), MaxFeatures::Fraction(0.25));
        assert!(matches!(
            "often".parse::<MaxFeatures>(),
            Err(ForestError::UnknownMaxFeatures { .. })
        ));
    }

    #[test]
    fn display_round_trips_named_modes() {
        for mode in [MaxFeatures::All, MaxFeatures::Sqrt, MaxFeatures::Log2] {
            assert_eq!(mode.to_string().parse::<MaxFeatures>().unwrap(), mode);
        }
    }
}
