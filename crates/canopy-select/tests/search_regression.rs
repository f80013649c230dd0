//! Integration tests for canopy-select: cross-validation and search on a
//! deterministic synthetic regression dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use canopy_forest::MaxFeatures;
use canopy_select::{
    CrossValidation, RandomizedSearch, ScoreMode, SearchSpace, cross_validation,
};

/// 80 samples, 4 features: y = 2*f0 + f1^2 + noise; f2 and f3 are noise.
fn make_regression() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut features = Vec::with_capacity(80);
    let mut targets = Vec::with_capacity(80);
    for _ in 0..80 {
        let row: Vec<f64> = (0..4).map(|_| rng.r#gen::<f64>() * 3.0).collect();
        targets.push(2.0 * row[0] + row[1] * row[1] + rng.r#gen::<f64>() * 0.1);
        features.push(row);
    }
    let names = (0..4).map(|f| format!("f{f}")).collect();
    (features, targets, names)
}

fn small_space() -> SearchSpace {
    SearchSpace::new()
        .with_n_estimators(vec![10, 20])
        .with_max_features(vec![MaxFeatures::All, MaxFeatures::Sqrt])
        .with_max_depth(vec![Some(2), None])
        .with_min_samples_split(vec![2, 10])
        .with_min_samples_leaf(vec![1, 4])
        .with_bootstrap(vec![true, false])
}

#[test]
fn k_fold_r2_above_threshold() {
    let (features, targets, names) = make_regression();
    let config = canopy_forest::RandomForestConfig::new(50).unwrap().with_seed(1);
    let cv = CrossValidation::k_fold(5, 1).unwrap();
    let score =
        cross_validation(&config, &features, &targets, &names, &cv, ScoreMode::Determination)
            .unwrap();
    assert!(score.r2 > 0.75, "5-fold r2 {} <= 0.75", score.r2);
}

#[test]
fn search_returns_grid_point_and_bounded_trials() {
    let (features, targets, names) = make_regression();
    let space = small_space();
    let search = RandomizedSearch::new(6, CrossValidation::k_fold(4, 1).unwrap())
        .unwrap()
        .with_seed(1);
    let outcome = search.run(&space, &features, &targets, &names).unwrap();

    assert_eq!(outcome.trials.len(), 6);
    let best = &outcome.best_params;
    assert!(space.n_estimators().contains(&best.n_estimators));
    assert!(space.max_features().contains(&best.max_features));
    assert!(space.max_depth().contains(&best.max_depth));
    assert!(space.min_samples_split().contains(&best.min_samples_split));
    assert!(space.min_samples_leaf().contains(&best.min_samples_leaf));
    assert!(space.bootstrap().contains(&best.bootstrap));

    let max_r2 = outcome
        .trials
        .iter()
        .map(|t| t.r2)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(outcome.best_score, max_r2);
}

#[test]
fn search_is_reproducible() {
    let (features, targets, names) = make_regression();
    let space = small_space();
    let run = |seed| {
        RandomizedSearch::new(4, CrossValidation::k_fold(3, seed).unwrap())
            .unwrap()
            .with_seed(seed)
            .run(&space, &features, &targets, &names)
            .unwrap()
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn small_grid_is_evaluated_exhaustively() {
    let (features, targets, names) = make_regression();
    let space = SearchSpace::new()
        .with_n_estimators(vec![5])
        .with_max_features(vec![MaxFeatures::All])
        .with_max_depth(vec![Some(1), None])
        .with_min_samples_split(vec![2])
        .with_min_samples_leaf(vec![1])
        .with_bootstrap(vec![false]);
    let outcome = RandomizedSearch::new(100, CrossValidation::k_fold(4, 1).unwrap())
        .unwrap()
        .run(&space, &features, &targets, &names)
        .unwrap();

    assert_eq!(outcome.trials.len(), 2);
    // A single split cannot fit the quadratic as well as a full tree.
    assert_eq!(outcome.best_params.max_depth, None);
}
