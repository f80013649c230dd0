//! Model selection for the canopy random forest.
//!
//! Train/test splitting, k-fold and leave-one-out cross-validation,
//! out-of-fold and held-out scoring, regression metrics, and a randomized
//! hyperparameter search evaluated in parallel via rayon.

mod error;
mod metrics;
mod search;
mod splitter;
mod validation;

pub use error::SelectError;
pub use metrics::{ScoreMode, r2_score, rmse, squared_correlation};
pub use search::{ForestParams, RandomizedSearch, SearchOutcome, SearchSpace, Trial, linspace};
pub use splitter::{CrossValidation, train_test_split};
pub use validation::{ValidationScore, cross_validation, external_validation};
