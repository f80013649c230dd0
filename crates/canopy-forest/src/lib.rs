//! Random forest regression: train, predict, persist.
//!
//! Provides a CART regression tree with squared-error splits and a bagged
//! ensemble on top of it, with parallel training via rayon, out-of-bag
//! evaluation, impurity-based feature importance, and model serialization.

mod config;
mod error;
mod forest;
mod importance;
mod node;
mod oob;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{MaxFeatures, OobMode, RandomForestConfig};
pub use error::ForestError;
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex, NodeStats};
pub use oob::OobScore;
pub use result::{RandomForestResult, TrainingSummary};
pub use tree::{DecisionTree, DecisionTreeConfig};
