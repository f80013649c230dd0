//! Random forest regression training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{OobMode, RandomForestConfig};
use crate::error::ForestError;
use crate::importance::aggregate_importances;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingSummary};
use crate::tree::{DecisionTree, DecisionTreeConfig, validate_training_data};

/// A fitted random forest regressor.
///
/// Predictions are the mean of the per-tree predictions.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Draw `n_samples` indices with replacement and return the bag plus the
/// indices that were never drawn.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut bootstrap_indices = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let idx = rng.gen_range(0..n_samples);
        bootstrap_indices.push(idx);
        in_bag[idx] = true;
    }
    let oob_indices: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (bootstrap_indices, oob_indices)
}

/// Train the random forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    feature_names: &[String],
) -> Result<RandomForestResult, ForestError> {
    let (n_samples, n_features) = validate_training_data(features, targets)?;
    if feature_names.len() != n_features {
        return Err(ForestError::FeatureNameMismatch {
            n_features,
            n_names: feature_names.len(),
        });
    }

    let max_features_resolved = config.max_features.resolve(n_features)?;
    let tree_template = DecisionTreeConfig::new()
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));
    tree_template.validate()?;

    if config.oob_mode == OobMode::Enabled && !config.bootstrap {
        return Err(ForestError::OobRequiresBootstrap);
    }

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        max_features = max_features_resolved,
        bootstrap = config.bootstrap,
        "training random forest"
    );

    // Per-tree seeds come from the master RNG so results do not depend on
    // rayon's scheduling.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();
    let bootstrap = config.bootstrap;

    let tree_results: Vec<(DecisionTree, Vec<usize>)> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let tree_config = tree_template.clone().with_seed(rng.r#gen());

            if !bootstrap {
                let tree =
                    tree_config.grow(features, targets, n_samples, n_features, max_features_resolved);
                return (tree, Vec::new());
            }

            let (bootstrap_indices, oob_indices) = bootstrap_sample(n_samples, &mut rng);
            let boot_features: Vec<Vec<f64>> = bootstrap_indices
                .iter()
                .map(|&i| features[i].clone())
                .collect();
            let boot_targets: Vec<f64> = bootstrap_indices.iter().map(|&i| targets[i]).collect();

            let tree = tree_config.grow(
                &boot_features,
                &boot_targets,
                n_samples,
                n_features,
                max_features_resolved,
            );
            (tree, oob_indices)
        })
        .collect();

    let (trees, oob_indices_per_tree): (Vec<DecisionTree>, Vec<Vec<usize>>) =
        tree_results.into_iter().unzip();

    let per_tree_importances: Vec<Vec<f64>> =
        trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree_importances, feature_names);

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let oob_score = if config.oob_mode == OobMode::Enabled {
        Some(compute_oob(&trees, features, targets, &oob_indices_per_tree)?)
    } else {
        None
    };

    let summary = TrainingSummary::new(&trees, n_samples, n_features, max_features_resolved, bootstrap);
    let forest = RandomForest {
        trees,
        n_features,
        feature_names: feature_names.to_vec(),
    };

    info!(
        oob_r2 = oob_score.as_ref().map(|s| s.r2),
        max_depth = summary.max_depth,
        mean_leaves = summary.mean_leaves,
        "random forest training complete"
    );

    Ok(RandomForestResult::new(forest, importances, oob_score, summary))
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, OobMode, RandomForestConfig};
    use crate::error::ForestError;

    /// y = 2x0 + noise-free step on x1, x2 is irrelevant.
    fn make_regression_data() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
        let mut features = Vec::new();
        let mut targets = Vec::new();
        for i in 0..60 {
            let x0 = i as f64 * 0.5;
            let x1 = if i % 2 == 0 { 0.0 } else { 1.0 };
            let x2 = ((i * 7) % 11) as f64;
            features.push(vec![x0, x1, x2]);
            targets.push(2.0 * x0 + 5.0 * x1);
        }
        let names = vec!["x0".to_string(), "x1".to_string(), "x2".to_string()];
        (features, targets, names)
    }

    fn r2(predicted: &[f64], observed: &[f64]) -> f64 {
        let mean = observed.iter().sum::<f64>() / observed.len() as f64;
        let ss_res: f64 = predicted.iter().zip(observed).map(|(p, o)| (o - p).powi(2)).sum();
        let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
        1.0 - ss_res / ss_tot
    }

    #[test]
    fn fits_training_data_closely() {
        let (features, targets, names) = make_regression_data();
        let result = RandomForestConfig::new(50)
            .unwrap()
            .with_seed(42)
            .fit(&features, &targets, &names)
            .unwrap();

        let predictions = result.forest().predict_batch(&features).unwrap();
        let score = r2(&predictions, &targets);
        assert!(score > 0.95, "training r2 = {score}");
    }

    #[test]
    fn no_bootstrap_full_depth_interpolates() {
        let (features, targets, names) = make_regression_data();
        let result = RandomForestConfig::new(5)
            .unwrap()
            .with_bootstrap(false)
            .fit(&features, &targets, &names)
            .unwrap();

        let predictions = result.forest().predict_batch(&features).unwrap();
        for (p, y) in predictions.iter().zip(&targets) {
            assert!((p - y).abs() < 1e-9, "predicted {p}, expected {y}");
        }
        assert!(result.oob_score().is_none());
        assert!(!result.summary().bootstrap);
        assert_eq!(result.summary().n_trees, 5);
    }

    #[test]
    fn oob_score_computed() {
        let (features, targets, names) = make_regression_data();
        let result = RandomForestConfig::new(50)
            .unwrap()
            .with_oob_mode(OobMode::Enabled)
            .with_seed(42)
            .fit(&features, &targets, &names)
            .unwrap();

        let oob = result.oob_score().expect("OOB should be computed");
        assert!(oob.r2 > 0.8, "oob r2 = {}", oob.r2);
        assert!(oob.rmse > 0.0);
        assert!(oob.n_oob_samples > 0);
        assert_eq!(oob.predictions.len(), features.len());
    }

    #[test]
    fn oob_without_bootstrap_rejected() {
        let (features, targets, names) = make_regression_data();
        let err = RandomForestConfig::new(5)
            .unwrap()
            .with_bootstrap(false)
            .with_oob_mode(OobMode::Enabled)
            .fit(&features, &targets, &names)
            .unwrap_err();
        assert!(matches!(err, ForestError::OobRequiresBootstrap));
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let (features, targets, names) = make_regression_data();
        let result = RandomForestConfig::new(20)
            .unwrap()
            .with_seed(42)
            .fit(&features, &targets, &names)
            .unwrap();

        let total: f64 = result.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
        assert_eq!(result.importances()[0].name, "x0");
        assert_eq!(result.importances()[0].rank, 1);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, targets, names) = make_regression_data();
        let fit = |seed| {
            RandomForestConfig::new(10)
                .unwrap()
                .with_seed(seed)
                .with_max_features(MaxFeatures::Sqrt)
                .fit(&features, &targets, &names)
                .unwrap()
                .into_forest()
                .predict_batch(&features)
                .unwrap()
        };
        assert_eq!(fit(99), fit(99));
        assert_ne!(fit(99), fit(100));
    }

    #[test]
    fn feature_name_mismatch() {
        let (features, targets, _) = make_regression_data();
        let err = RandomForestConfig::new(3)
            .unwrap()
            .fit(&features, &targets, &["only".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::FeatureNameMismatch { n_features: 3, n_names: 1 }
        ));
    }

    #[test]
    fn empty_dataset_error() {
        let config = RandomForestConfig::new(10).unwrap();
        let err = config.fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn invalid_max_features_error() {
        let (features, targets, names) = make_regression_data();
        let err = RandomForestConfig::new(3)
            .unwrap()
            .with_max_features(MaxFeatures::Fixed(4))
            .fit(&features, &targets, &names)
            .unwrap_err();
        assert!(matches!(err, ForestError::InvalidMaxFeatures { max_features: 4, n_features: 3 }));
    }
}
