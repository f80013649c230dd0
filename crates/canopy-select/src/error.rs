use canopy_forest::ForestError;

/// Errors from splitting, out-of-fold prediction, scoring and search.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// Returned when a test fraction is not strictly between 0 and 1.
    #[error("test fraction must be a finite value in (0, 1), got {fraction}")]
    InvalidTestFraction {
        /// The fraction provided.
        fraction: f64,
    },

    /// Returned when a split would leave one side empty.
    #[error("splitting {n_samples} samples with test fraction {fraction} leaves an empty partition")]
    EmptyPartition {
        /// Number of samples being split.
        n_samples: usize,
        /// The fraction provided.
        fraction: f64,
    },

    /// Returned when a k-fold splitter is configured with fewer than 2 folds.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid fold count.
        n_folds: usize,
    },

    /// Returned when there are fewer samples than folds.
    #[error("cannot split {n_samples} samples into {n_folds} folds")]
    TooFewSamplesForFolds {
        /// Number of samples available.
        n_samples: usize,
        /// Number of folds requested (n_samples for leave-one-out).
        n_folds: usize,
    },

    /// Returned when a metric receives slices of different lengths.
    #[error("got {n_predicted} predictions for {n_observed} observations")]
    LengthMismatch {
        /// Number of observed values.
        n_observed: usize,
        /// Number of predicted values.
        n_predicted: usize,
    },

    /// Returned when a metric receives no values.
    #[error("cannot score an empty set of predictions")]
    EmptyScore,

    /// Returned when a search space has an empty grid for some parameter.
    #[error("search space has no values for {parameter}")]
    EmptySearchSpace {
        /// Name of the parameter with no candidate values.
        parameter: &'static str,
    },

    /// Returned when a linspace request is malformed.
    #[error("linspace needs at least one point, got {num}")]
    InvalidLinspace {
        /// The requested number of points.
        num: usize,
    },

    /// Returned when the randomized search is asked for zero iterations.
    #[error("n_iter must be at least 1")]
    InvalidIterationCount,

    /// Propagated from the random forest.
    #[error(transparent)]
    Forest(#[from] ForestError),
}
