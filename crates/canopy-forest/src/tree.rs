use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    ForestError,
    node::{Node, NodeIndex, NodeStats},
    split::find_best_split,
};

/// Check a row-major training set and its targets.
///
/// Returns `(n_samples, n_features)` on success.
pub(crate) fn validate_training_data(
    features: &[Vec<f64>],
    targets: &[f64],
) -> Result<(usize, usize), ForestError> {
    if features.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    let n_samples = features.len();
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ForestError::ZeroFeatures);
    }
    if targets.len() != n_samples {
        return Err(ForestError::TargetLengthMismatch {
            n_samples,
            n_targets: targets.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    if let Some(sample_index) = targets.iter().position(|v| !v.is_finite()) {
        return Err(ForestError::NonFiniteTarget { sample_index });
    }
    Ok((n_samples, n_features))
}

/// Configuration for a single CART regression tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until all leaves are pure or stopping conditions
    /// are met. `Some(d)` limits depth to `d` levels (root is depth 0).
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

    /// Set the maximum number of features to consider at each split.
    ///
    /// `None` means consider all features.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
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

    /// Return the maximum features to consider per split, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the hyperparameters that do not depend on the data.
    pub(crate) fn validate(&self) -> Result<(), ForestError> {
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(ForestError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        Ok(())
    }

    /// Train a regression tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]` is row-major.
    /// `targets[sample_idx]` is the continuous response.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                              |
    /// |----------------------------------------|---------------------------------------------------|
    /// | [`ForestError::EmptyDataset`]          | `features` is empty                               |
    /// | [`ForestError::ZeroFeatures`]          | rows have zero feature columns                    |
    /// | [`ForestError::TargetLengthMismatch`]  | `targets.len() != features.len()`                 |
    /// | [`ForestError::FeatureCountMismatch`]  | rows have inconsistent lengths                    |
    /// | [`ForestError::NonFiniteValue`]        | any feature value is NaN or infinite              |
    /// | [`ForestError::NonFiniteTarget`]       | any target is NaN or infinite                     |
    /// | [`ForestError::InvalidMaxFeatures`]    | `max_features` resolves outside [1, n_features]   |
    /// | [`ForestError::InvalidMaxDepth`]       | `max_depth` is `Some(0)`                          |
    /// | [`ForestError::InvalidMinSamplesSplit`]| `min_samples_split` < 2                           |
    /// | [`ForestError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1                            |
    #[instrument(skip(self, features, targets), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<DecisionTree, ForestError> {
        let (n_samples, n_features) = validate_training_data(features, targets)?;
        self.validate()?;

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        Ok(self.grow(features, targets, n_samples, n_features, max_features))
    }

    /// Grow a tree on data that has already been validated.
    pub(crate) fn grow(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        n_samples: usize,
        n_features: usize,
        max_features: usize,
    ) -> DecisionTree {
        // Column-major layout for the split scan.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let sample_indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut arena: Vec<Node> = Vec::new();

        let mut builder = TreeBuilder {
            col_features: &col_features,
            targets,
            config: self,
            max_features,
            rng: &mut rng,
            arena: &mut arena,
        };
        let root = builder.build(&sample_indices, 0);

        debug!(
            root_index = root.index(),
            n_nodes = arena.len(),
            "regression tree built"
        );

        DecisionTree {
            nodes: arena,
            n_features,
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive arena builder; holds the inputs shared by every node.
struct TreeBuilder<'a, 'r> {
    col_features: &'a [Vec<f64>],
    targets: &'a [f64],
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: &'r mut ChaCha8Rng,
    arena: &'r mut Vec<Node>,
}

impl TreeBuilder<'_, '_> {
    /// Build the subtree for `sample_indices` and return its arena index.
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();

        let (sum, sum_sq) = sample_indices.iter().fold((0.0, 0.0), |(s, sq), &si| {
            let y = self.targets[si];
            (s + y, sq + y * y)
        });
        let stats = NodeStats::from_sums(sum, sum_sq, n_samples);

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split
            || n_samples < 2 * self.config.min_samples_leaf;
        let pure = stats.impurity.is_pure();

        let leaf = Node::Leaf(stats);

        if too_few || pure || depth_exceeded {
            return self.push(leaf);
        }

        let Some(split) = find_best_split(
            self.col_features,
            self.targets,
            sample_indices,
            self.max_features,
            self.config.min_samples_leaf,
            &mut *self.rng,
        )
        .filter(|s| !s.left_indices.is_empty() && !s.right_indices.is_empty()) else {
            return self.push(leaf);
        };

        // Reserve the slot, recurse, then overwrite with the split.
        let node_idx = self.push(leaf);

        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.arena[node_idx.index()] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity_decrease: split.impurity_decrease,
            stats,
        };

        node_idx
    }

    fn push(&mut self, node: Node) -> NodeIndex {
        let idx = self.arena.len();
        self.arena.push(node);
        NodeIndex::new(idx)
    }
}

/// A fitted CART regression tree.
///
/// Stored as an arena-based `Vec<Node>` with index references.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Predict the response for a single sample.
    ///
    /// Traverses from the root (index 0): at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(self.predict_unchecked(sample))
    }

    /// Predict without checking the sample width.
    pub(crate) fn predict_unchecked(&self, sample: &[f64]) -> f64 {
        let mut node = &self.nodes[NodeIndex::ROOT.index()];
        while let Some(child) = node.route(sample) {
            node = &self.nodes[child.index()];
        }
        node.value()
    }

    /// Compute Mean Decrease in Impurity (MDI) feature importances.
    ///
    /// Accumulates `impurity_decrease` per feature over all split nodes and
    /// normalizes the totals to sum to 1.0. All zeros for a single-leaf tree.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Borrow the node arena (root at index 0).
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf(_) => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }
}
