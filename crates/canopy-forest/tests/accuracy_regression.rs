//! Accuracy regression tests for canopy-forest.
//!
//! These tests verify that algorithmic changes do not degrade random forest
//! regression quality on a deterministic synthetic dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use canopy_forest::{MaxFeatures, OobMode, RandomForestConfig};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic regression dataset
// ---------------------------------------------------------------------------

/// Generate a 300-sample, 10-feature regression dataset.
///
/// y = 3*f0 + 2*f1 - f2 + noise in [0, 0.2]. Features 3-9 are pure noise.
fn make_regression() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n_samples = 300;
    let n_features = 10;

    let mut features = Vec::with_capacity(n_samples);
    let mut targets = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let row: Vec<f64> = (0..n_features).map(|_| rng.r#gen::<f64>() * 4.0).collect();
        let y = 3.0 * row[0] + 2.0 * row[1] - row[2] + rng.r#gen::<f64>() * 0.2;
        features.push(row);
        targets.push(y);
    }
    let names: Vec<String> = (0..n_features).map(|f| format!("f{f}")).collect();
    (features, targets, names)
}

fn r2(predicted: &[f64], observed: &[f64]) -> f64 {
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_res: f64 = predicted.iter().zip(observed).map(|(p, o)| (o - p).powi(2)).sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    1.0 - ss_res / ss_tot
}

// ---------------------------------------------------------------------------
// a) holdout_r2_above_threshold
// ---------------------------------------------------------------------------

/// Train on the first 240 samples, score the last 60.
#[test]
fn holdout_r2_above_threshold() {
    let (features, targets, names) = make_regression();
    let (train_x, test_x) = features.split_at(240);
    let (train_y, test_y) = targets.split_at(240);

    let result = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .fit(train_x, train_y, &names)
        .unwrap();
    let predictions = result.forest().predict_batch(test_x).unwrap();
    let score = r2(&predictions, test_y);

    assert!(score > 0.75, "holdout r2 {score} <= 0.75");
}

// ---------------------------------------------------------------------------
// b) oob_r2_above_threshold
// ---------------------------------------------------------------------------

#[test]
fn oob_r2_above_threshold() {
    let (features, targets, names) = make_regression();
    let result = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .with_oob_mode(OobMode::Enabled)
        .fit(&features, &targets, &names)
        .unwrap();

    let oob = result
        .oob_score()
        .expect("OOB score must be computed when OobMode::Enabled");
    assert!(oob.r2 > 0.7, "oob r2 {} <= 0.7", oob.r2);
    assert_eq!(oob.n_oob_samples, features.len());
}

// ---------------------------------------------------------------------------
// c) top_features_are_informative
// ---------------------------------------------------------------------------

/// f0 must rank first, and the top 3 must contain at least 2 of f0, f1, f2.
#[test]
fn top_features_are_informative() {
    let (features, targets, names) = make_regression();
    let result = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .with_max_features(MaxFeatures::Sqrt)
        .fit(&features, &targets, &names)
        .unwrap();

    let informative: std::collections::HashSet<&str> = ["f0", "f1", "f2"].into_iter().collect();
    let top3: Vec<&str> = result
        .importances()
        .iter()
        .take(3)
        .map(|f| f.name.as_str())
        .collect();

    assert_eq!(top3[0], "f0", "top-3: {top3:?}");
    let hits = top3.iter().filter(|&&n| informative.contains(n)).count();
    assert!(hits >= 2, "only {hits}/3 of top-3 features are informative; top-3: {top3:?}");
}
