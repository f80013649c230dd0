//! What a training run produces besides the forest itself.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::oob::OobScore;
use crate::tree::DecisionTree;

/// Shape of a training run and of the trees it grew.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingSummary {
    pub n_trees: usize,
    pub n_samples: usize,
    pub n_features: usize,
    /// Features drawn per split after resolving `MaxFeatures`.
    pub max_features_resolved: usize,
    pub bootstrap: bool,
    /// Deepest tree in the ensemble.
    pub max_depth: usize,
    /// Mean number of leaves per tree.
    pub mean_leaves: f64,
}

impl TrainingSummary {
    pub(crate) fn new(
        trees: &[DecisionTree],
        n_samples: usize,
        n_features: usize,
        max_features_resolved: usize,
        bootstrap: bool,
    ) -> Self {
        let n_trees = trees.len();
        let total_leaves: usize = trees.iter().map(DecisionTree::n_leaves).sum();
        Self {
            n_trees,
            n_samples,
            n_features,
            max_features_resolved,
            bootstrap,
            max_depth: trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            mean_leaves: if n_trees == 0 {
                0.0
            } else {
                total_leaves as f64 / n_trees as f64
            },
        }
    }
}

/// A fitted forest together with its importances, summary and OOB score.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    oob: Option<OobScore>,
    summary: TrainingSummary,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        oob: Option<OobScore>,
        summary: TrainingSummary,
    ) -> Self {
        Self {
            forest,
            importances,
            oob,
            summary,
        }
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Split into the forest and its ranked importances.
    #[must_use]
    pub fn into_parts(self) -> (RandomForest, Vec<RankedFeature>) {
        (self.forest, self.importances)
    }

    /// Mean-decrease-in-impurity importances, most important first.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Out-of-bag score; `None` unless `OobMode::Enabled` was set.
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob.as_ref()
    }

    #[must_use]
    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }
}
