//! Randomized hyperparameter search over a forest parameter grid.

use canopy_forest::{ForestError, MaxFeatures, RandomForestConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::error::SelectError;
use crate::metrics::ScoreMode;
use crate::splitter::CrossValidation;
use crate::validation::cross_validation;

/// `num` evenly spaced values over `[start, stop]`, both ends included.
///
/// # Errors
///
/// Returns [`SelectError::InvalidLinspace`] when `num` is zero.
pub fn linspace(start: f64, stop: f64, num: usize) -> Result<Vec<f64>, SelectError> {
    match num {
        0 => Err(SelectError::InvalidLinspace { num }),
        1 => Ok(vec![start]),
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut values: Vec<f64> = (0..num).map(|i| start + step * i as f64).collect();
            // Pin the endpoint so truncation to integers cannot lose it.
            values[num - 1] = stop;
            Ok(values)
        }
    }
}

/// One concrete set of forest hyperparameters.
///
/// # Defaults
///
/// | Parameter           | Default |
/// |---------------------|---------|
/// | `n_estimators`      | 100     |
/// | `max_features`      | `All`   |
/// | `max_depth`         | `None`  |
/// | `min_samples_split` | 2       |
/// | `min_samples_leaf`  | 1       |
/// | `bootstrap`         | `true`  |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ForestParams {
    /// Number of trees.
    pub n_estimators: usize,
    /// Features considered per split.
    pub max_features: MaxFeatures,
    /// Depth limit, `None` for unbounded.
    pub max_depth: Option<usize>,
    /// Minimum samples needed to split a node.
    pub min_samples_split: usize,
    /// Minimum samples in each leaf.
    pub min_samples_leaf: usize,
    /// Whether each tree sees a bootstrap sample.
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_features: MaxFeatures::All,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    /// Build the forest configuration these parameters describe.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_estimators` is zero.
    pub fn to_config(&self, seed: u64) -> Result<RandomForestConfig, ForestError> {
        Ok(RandomForestConfig::new(self.n_estimators)?
            .with_max_features(self.max_features)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_bootstrap(self.bootstrap)
            .with_seed(seed))
    }
}

/// Candidate values for each hyperparameter.
///
/// The grid is the Cartesian product of the lists.
///
/// # Defaults
///
/// | Parameter           | Default                         |
/// |---------------------|---------------------------------|
/// | `n_estimators`      | linspace(200, 1000, 100)        |
/// | `max_features`      | `[All, Sqrt]`                   |
/// | `max_depth`         | linspace(10, 110, 11) + `None`  |
/// | `min_samples_split` | `[2, 5, 10, 20]`                |
/// | `min_samples_leaf`  | `[1, 2, 4, 6]`                  |
/// | `bootstrap`         | `[true, false]`                 |
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    n_estimators: Vec<usize>,
    max_features: Vec<MaxFeatures>,
    max_depth: Vec<Option<usize>>,
    min_samples_split: Vec<usize>,
    min_samples_leaf: Vec<usize>,
    bootstrap: Vec<bool>,
}

impl SearchSpace {
    /// Create the default search space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_estimators: Self::estimator_grid(200, 1000, 100).unwrap_or_default(),
            max_features: vec![MaxFeatures::All, MaxFeatures::Sqrt],
            max_depth: Self::depth_grid(10, 110, 11).unwrap_or_default(),
            min_samples_split: vec![2, 5, 10, 20],
            min_samples_leaf: vec![1, 2, 4, 6],
            bootstrap: vec![true, false],
        }
    }

    /// Linearly spaced tree counts, truncated to integers and deduplicated.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidLinspace`] when `num` is zero.
    pub fn estimator_grid(start: usize, stop: usize, num: usize) -> Result<Vec<usize>, SelectError> {
        let mut grid: Vec<usize> = linspace(start as f64, stop as f64, num)?
            .into_iter()
            .map(|v| v as usize)
            .collect();
        grid.dedup();
        Ok(grid)
    }

    /// Linearly spaced depth limits followed by the unbounded option.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidLinspace`] when `num` is zero.
    pub fn depth_grid(
        start: usize,
        stop: usize,
        num: usize,
    ) -> Result<Vec<Option<usize>>, SelectError> {
        let mut grid: Vec<Option<usize>> = linspace(start as f64, stop as f64, num)?
            .into_iter()
            .map(|v| Some(v as usize))
            .collect();
        grid.dedup();
        grid.push(None);
        Ok(grid)
    }

    /// Set the candidate tree counts.
    #[must_use]
    pub fn with_n_estimators(mut self, values: Vec<usize>) -> Self {
        self.n_estimators = values;
        self
    }

    /// Set the candidate max_features strategies.
    #[must_use]
    pub fn with_max_features(mut self, values: Vec<MaxFeatures>) -> Self {
        self.max_features = values;
        self
    }

    /// Set the candidate depth limits.
    #[must_use]
    pub fn with_max_depth(mut self, values: Vec<Option<usize>>) -> Self {
        self.max_depth = values;
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

    /// Candidate tree counts.
    #[must_use]
    pub fn n_estimators(&self) -> &[usize] {
        &self.n_estimators
    }

    /// Candidate max_features strategies.
    #[must_use]
    pub fn max_features(&self) -> &[MaxFeatures] {
        &self.max_features
    }

    /// Candidate depth limits.
    #[must_use]
    pub fn max_depth(&self) -> &[Option<usize>] {
        &self.max_depth
    }

    /// Candidate min_samples_split values.
    #[must_use]
    pub fn min_samples_split(&self) -> &[usize] {
        &self.min_samples_split
    }

    /// Candidate min_samples_leaf values.
    #[must_use]
    pub fn min_samples_leaf(&self) -> &[usize] {
        &self.min_samples_leaf
    }

    /// Candidate bootstrap flags.
    #[must_use]
    pub fn bootstrap(&self) -> &[bool] {
        &self.bootstrap
    }

    /// Number of points in the grid.
    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.n_estimators.len()
            * self.max_features.len()
            * self.max_depth.len()
            * self.min_samples_split.len()
            * self.min_samples_leaf.len()
            * self.bootstrap.len()
    }

    fn validate(&self) -> Result<(), SelectError> {
        let lengths = [
            ("n_estimators", self.n_estimators.len()),
            ("max_features", self.max_features.len()),
            ("max_depth", self.max_depth.len()),
            ("min_samples_split", self.min_samples_split.len()),
            ("min_samples_leaf", self.min_samples_leaf.len()),
            ("bootstrap", self.bootstrap.len()),
        ];
        match lengths.iter().find(|(_, len)| *len == 0) {
            Some((parameter, _)) => Err(SelectError::EmptySearchSpace { parameter }),
            None => Ok(()),
        }
    }

    /// Decode a flat grid index (mixed radix, bootstrap varying fastest).
    fn candidate(&self, mut index: usize) -> ForestParams {
        let mut take = |len: usize| {
            let digit = index % len;
            index /= len;
            digit
        };
        let bootstrap = self.bootstrap[take(self.bootstrap.len())];
        let min_samples_leaf = self.min_samples_leaf[take(self.min_samples_leaf.len())];
        let min_samples_split = self.min_samples_split[take(self.min_samples_split.len())];
        let max_depth = self.max_depth[take(self.max_depth.len())];
        let max_features = self.max_features[take(self.max_features.len())];
        let n_estimators = self.n_estimators[take(self.n_estimators.len())];
        ForestParams {
            n_estimators,
            max_features,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            bootstrap,
        }
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Trial {
    /// The evaluated parameters.
    pub params: ForestParams,
    /// Cross-validated R².
    pub r2: f64,
    /// Cross-validated RMSE.
    pub rmse: f64,
}

/// Result of a randomized search.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SearchOutcome {
    /// Parameters of the best-scoring trial.
    pub best_params: ForestParams,
    /// Cross-validated R² of the best trial.
    pub best_score: f64,
    /// Every evaluated trial, in sampling order.
    pub trials: Vec<Trial>,
}

/// Randomized search over a [`SearchSpace`].
///
/// Construct via [`RandomizedSearch::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter | Default         |
/// |-----------|-----------------|
/// | `seed`    | 1               |
/// | `mode`    | `Determination` |
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    n_iter: usize,
    seed: u64,
    cv: CrossValidation,
    mode: ScoreMode,
}

impl RandomizedSearch {
    /// Create a search that evaluates up to `n_iter` grid points with `cv`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidIterationCount`] if `n_iter` is zero.
    pub fn new(n_iter: usize, cv: CrossValidation) -> Result<Self, SelectError> {
        if n_iter == 0 {
            return Err(SelectError::InvalidIterationCount);
        }
        Ok(Self {
            n_iter,
            seed: 1,
            cv,
            mode: ScoreMode::Determination,
        })
    }

    /// Set the seed used for sampling grid points and fitting forests.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set how candidates are scored.
    #[must_use]
    pub fn with_mode(mut self, mode: ScoreMode) -> Self {
        self.mode = mode;
        self
    }

    /// Return the iteration budget.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the cross-validation strategy.
    #[must_use]
    pub fn cv(&self) -> &CrossValidation {
        &self.cv
    }

    /// Pick the grid indices to evaluate.
    ///
    /// The whole grid, in order, when it has at most `n_iter` points;
    /// otherwise `n_iter` distinct indices sampled without replacement.
    fn sample_indices(&self, n_candidates: usize) -> Vec<usize> {
        if n_candidates <= self.n_iter {
            return (0..n_candidates).collect();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rand::seq::index::sample(&mut rng, n_candidates, self.n_iter).into_vec()
    }

    /// Evaluate sampled grid points by cross-validated R² and keep the best.
    ///
    /// Candidates are evaluated in parallel; ties keep the earliest trial.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SelectError::EmptySearchSpace`] | a parameter has no candidate values |
    /// | [`SelectError::TooFewSamplesForFolds`] | fewer samples than folds |
    /// | [`SelectError::Forest`] | a candidate is invalid or failed to train |
    #[instrument(skip_all, fields(n_iter = self.n_iter, method = %self.cv, n_samples = features.len()))]
    pub fn run(
        &self,
        space: &SearchSpace,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<SearchOutcome, SelectError> {
        space.validate()?;
        let n_candidates = space.n_candidates();
        let candidates: Vec<ForestParams> = self
            .sample_indices(n_candidates)
            .into_iter()
            .map(|i| space.candidate(i))
            .collect();

        info!(n_candidates, n_trials = candidates.len(), "starting randomized search");

        let trials: Vec<Trial> = candidates
            .into_par_iter()
            .map(|params| -> Result<Trial, SelectError> {
                let config = params.to_config(self.seed)?;
                let score = cross_validation(
                    &config,
                    features,
                    targets,
                    feature_names,
                    &self.cv,
                    self.mode,
                )?;
                debug!(?params, r2 = score.r2, rmse = score.rmse, "trial completed");
                Ok(Trial {
                    params,
                    r2: score.r2,
                    rmse: score.rmse,
                })
            })
            .collect::<Result<_, _>>()?;

        let mut best = &trials[0];
        for trial in &trials[1..] {
            if trial.r2 > best.r2 {
                best = trial;
            }
        }
        let (best_params, best_score) = (best.params.clone(), best.r2);

        info!(best_score, ?best_params, "randomized search complete");

        Ok(SearchOutcome {
            best_params,
            best_score,
            trials,
        })
    }
}
