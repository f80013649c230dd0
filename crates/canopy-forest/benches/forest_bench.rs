//! Criterion benchmarks for canopy-forest: training and prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use canopy_forest::{MaxFeatures, RandomForestConfig};

fn make_regression(
    n_samples: usize,
    n_features: usize,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut targets = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let row: Vec<f64> = (0..n_features).map(|_| rng.r#gen::<f64>()).collect();
        targets.push(row[0] * 4.0 + row[1] * row[2] + rng.r#gen::<f64>() * 0.1);
        features.push(row);
    }
    let names: Vec<String> = (0..n_features).map(|f| format!("f{f}")).collect();
    (features, targets, names)
}

fn bench_train(c: &mut Criterion) {
    let (features, targets, names) = make_regression(500, 20, 42);
    let cfg = RandomForestConfig::new(50).unwrap().with_seed(42);

    c.bench_function("forest_train_500x20_50trees", |b| {
        b.iter(|| cfg.fit(&features, &targets, &names).unwrap());
    });
}

fn bench_train_sqrt(c: &mut Criterion) {
    let (features, targets, names) = make_regression(500, 20, 42);
    let cfg = RandomForestConfig::new(50)
        .unwrap()
        .with_max_features(MaxFeatures::Sqrt)
        .with_seed(42);

    c.bench_function("forest_train_500x20_50trees_sqrt", |b| {
        b.iter(|| cfg.fit(&features, &targets, &names).unwrap());
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let (features, targets, names) = make_regression(500, 20, 42);
    let forest = RandomForestConfig::new(50)
        .unwrap()
        .with_seed(42)
        .fit(&features, &targets, &names)
        .unwrap()
        .into_forest();

    c.bench_function("forest_predict_batch_500x20_50trees", |b| {
        b.iter(|| forest.predict_batch(&features).unwrap());
    });
}

criterion_group!(benches, bench_train, bench_train_sqrt, bench_predict_batch);
criterion_main!(benches);
