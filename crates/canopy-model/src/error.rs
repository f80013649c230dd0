use canopy_forest::ForestError;
use canopy_select::SelectError;

/// Errors from configuring and running the regression workflow.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when the dataset has no rows.
    #[error("dataset has no rows")]
    EmptyDataset,

    /// Returned when the dataset has no feature columns.
    #[error("dataset has no feature columns")]
    NoFeatureColumns,

    /// Returned when neither a split fraction nor a validation dataset is given.
    #[error("either split_for_validation or dataset_validation must be provided")]
    MissingValidationSource,

    /// Returned when both a split fraction and a validation dataset are given.
    #[error("split_for_validation and dataset_validation are mutually exclusive")]
    AmbiguousValidationSource,

    /// Returned when the split fraction is not a finite value in (0, 1).
    #[error("split_for_validation must be a finite value in (0, 1), got {fraction}")]
    InvalidSplitFraction {
        /// The fraction provided.
        fraction: f64,
    },

    /// Returned when the validation dataset has no rows.
    #[error("validation dataset has no rows")]
    EmptyValidationDataset,

    /// Returned when the validation dataset's feature columns differ from the calibration dataset's.
    #[error("validation dataset features {found:?} do not match calibration features {expected:?}")]
    ValidationColumnsMismatch {
        /// Calibration feature names.
        expected: Vec<String>,
        /// Validation feature names.
        found: Vec<String>,
    },

    /// Returned when the cross-validation specifier is neither "loo" nor a fold count >= 2.
    #[error("invalid cross-validation type \"{value}\": expected \"loo\" or an integer fold count >= 2")]
    InvalidCrossValidation {
        /// The raw specifier.
        value: String,
    },

    /// Propagated from the random forest.
    #[error(transparent)]
    Forest(#[from] ForestError),

    /// Propagated from splitting, scoring or search.
    #[error(transparent)]
    Select(#[from] SelectError),
}
