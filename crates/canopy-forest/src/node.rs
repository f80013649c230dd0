use std::fmt;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Column position in the feature matrix.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Position of a node in a tree's arena. The root is [`NodeIndex::ROOT`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The root node.
    pub const ROOT: NodeIndex = NodeIndex(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Mean squared deviation of a node's targets from their mean.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) const ZERO: Impurity = Impurity(0.0);

    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Raw variance.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// `true` when every target in the node is (numerically) equal.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= f64::EPSILON
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Training statistics recorded on every node.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeStats {
    /// Mean target of the samples that reached the node.
    pub value: f64,
    /// Target variance at the node.
    pub impurity: Impurity,
    /// Number of training samples that reached the node.
    pub n_samples: usize,
}

impl NodeStats {
    /// Statistics from a node's running target sums.
    ///
    /// Tiny negative variances from floating-point cancellation are clamped
    /// to zero. An empty node has mean 0 and impurity 0.
    pub(crate) fn from_sums(sum: f64, sum_sq: f64, n_samples: usize) -> Self {
        if n_samples == 0 {
            return Self {
                value: 0.0,
                impurity: Impurity::ZERO,
                n_samples,
            };
        }
        let n = n_samples as f64;
        let mean = sum / n;
        Self {
            value: mean,
            impurity: Impurity::new((sum_sq / n - mean * mean).max(0.0)),
            n_samples,
        }
    }
}

/// A node of a regression tree.
///
/// Children are arena positions, not pointers. Interior nodes keep their
/// own statistics so a tree can be inspected or truncated at any depth.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Interior node; samples with `x[feature] <= threshold` go left.
    Split {
        feature: FeatureIndex,
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        /// `n_samples * impurity - n_left * impurity_left - n_right * impurity_right`.
        impurity_decrease: f64,
        stats: NodeStats,
    },
    /// Terminal node predicting `stats.value`.
    Leaf(NodeStats),
}

impl Node {
    /// Statistics of this node.
    #[must_use]
    pub fn stats(&self) -> &NodeStats {
        match self {
            Node::Split { stats, .. } | Node::Leaf(stats) => stats,
        }
    }

    /// Mean training target at this node.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.stats().value
    }

    /// Target variance at this node.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        self.stats().impurity
    }

    /// Number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.stats().n_samples
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// The child `sample` is routed to, or `None` at a leaf.
    ///
    /// `sample` must have at least `feature + 1` values.
    #[must_use]
    pub fn route(&self, sample: &[f64]) -> Option<NodeIndex> {
        match self {
            Node::Leaf(_) => None,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => Some(if sample[feature.index()] <= *threshold {
                *left
            } else {
                *right
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_on_second_feature() -> Node {
        Node::Split {
            feature: FeatureIndex::new(1),
            threshold: 3.5,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity_decrease: 12.0,
            stats: NodeStats::from_sums(40.0, 100.0, 20),
        }
    }

    #[test]
    fn stats_from_sums() {
        // targets 1, 2, 3: mean 2, variance 2/3
        let stats = NodeStats::from_sums(6.0, 14.0, 3);
        assert!((stats.value - 2.0).abs() < 1e-12);
        assert!((stats.impurity.value() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.n_samples, 3);
    }

    #[test]
    fn empty_and_constant_nodes_are_pure() {
        assert!(NodeStats::from_sums(0.0, 0.0, 0).impurity.is_pure());
        // five targets of 0.1: cancellation must not go negative
        let stats = NodeStats::from_sums(0.5, 0.05, 5);
        assert!(stats.impurity.value() >= 0.0);
        assert!(stats.impurity.is_pure());
    }

    #[test]
    fn split_routes_on_threshold() {
        let node = split_on_second_feature();
        assert!(!node.is_leaf());
        assert_eq!(node.route(&[99.0, 3.5]), Some(NodeIndex::new(1)));
        assert_eq!(node.route(&[-99.0, 3.6]), Some(NodeIndex::new(2)));
        assert_eq!(node.n_samples(), 20);
        assert!((node.value() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn leaf_does_not_route() {
        let leaf = Node::Leaf(NodeStats::from_sums(5.0, 12.5, 2));
        assert!(leaf.is_leaf());
        assert_eq!(leaf.route(&[0.0]), None);
        assert!((leaf.value() - 2.5).abs() < 1e-12);
        assert!(leaf.impurity().is_pure());
    }

    #[test]
    fn impurity_display() {
        assert_eq!(format!("{}", Impurity::new(1.0 / 3.0)), "0.333333");
        assert_eq!(NodeIndex::ROOT.index(), 0);
    }
}
