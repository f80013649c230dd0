//! Out-of-fold prediction and held-out scoring.

use canopy_forest::{RandomForest, RandomForestConfig};
use tracing::{debug, info, instrument};

use crate::error::SelectError;
use crate::metrics::{ScoreMode, rmse};
use crate::splitter::CrossValidation;

/// Predictions and error metrics for a set of observations.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationScore {
    /// R² under the requested [`ScoreMode`].
    pub r2: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// One prediction per observation, in input order.
    pub predictions: Vec<f64>,
}

impl ValidationScore {
    fn compute(observed: &[f64], predictions: Vec<f64>, mode: ScoreMode) -> Result<Self, SelectError> {
        Ok(Self {
            r2: mode.score(observed, &predictions)?,
            rmse: rmse(observed, &predictions)?,
            predictions,
        })
    }
}

fn select_rows<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

/// Cross-validated predictions for every sample.
///
/// For each fold produced by `cv`, a fresh forest is fit with `config` on
/// the remaining samples and predicts the held-out ones. The pooled
/// out-of-fold predictions are then scored against `targets`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SelectError::TooFewSamplesForFolds`] | fewer samples than folds |
/// | [`SelectError::Forest`] | a fold failed to train or predict |
#[instrument(skip_all, fields(method = %cv, n_samples = features.len()))]
pub fn cross_validation(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    feature_names: &[String],
    cv: &CrossValidation,
    mode: ScoreMode,
) -> Result<ValidationScore, SelectError> {
    let n_samples = features.len();
    let folds = cv.folds(n_samples)?;
    let mut predictions = vec![0.0f64; n_samples];
    let mut in_test = vec![false; n_samples];

    for (fold, test_indices) in folds.iter().enumerate() {
        in_test.iter_mut().for_each(|flag| *flag = false);
        for &i in test_indices {
            in_test[i] = true;
        }
        let train_indices: Vec<usize> = (0..n_samples).filter(|&i| !in_test[i]).collect();

        let train_features = select_rows(features, &train_indices);
        let train_targets = select_rows(targets, &train_indices);
        let test_features = select_rows(features, test_indices);

        let forest = config
            .fit(&train_features, &train_targets, feature_names)?
            .into_forest();
        let fold_predictions = forest.predict_batch(&test_features)?;
        for (&i, p) in test_indices.iter().zip(fold_predictions) {
            predictions[i] = p;
        }

        debug!(fold, n_test = test_indices.len(), "fold completed");
    }

    let score = ValidationScore::compute(targets, predictions, mode)?;
    info!(r2 = score.r2, rmse = score.rmse, "cross-validation complete");
    Ok(score)
}

/// Score a fitted forest on held-out data.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SelectError::Forest`] | a row has the wrong number of features |
/// | [`SelectError::LengthMismatch`] | `targets` and `features` differ in length |
/// | [`SelectError::EmptyScore`] | no rows were given |
#[instrument(skip_all, fields(n_samples = features.len()))]
pub fn external_validation(
    forest: &RandomForest,
    features: &[Vec<f64>],
    targets: &[f64],
    mode: ScoreMode,
) -> Result<ValidationScore, SelectError> {
    let predictions = forest.predict_batch(features)?;
    let score = ValidationScore::compute(targets, predictions, mode)?;
    info!(r2 = score.r2, rmse = score.rmse, "external validation complete");
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
        let features: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let targets: Vec<f64> = (0..n).map(|i| 1.5 * i as f64).collect();
        (features, targets, vec!["x".to_string(), "z".to_string()])
    }

    #[test]
    fn k_fold_predicts_every_sample() {
        let (features, targets, names) = linear_data(30);
        let config = RandomForestConfig::new(20).unwrap().with_seed(1);
        let cv = CrossValidation::k_fold(5, 1).unwrap();
        let score =
            cross_validation(&config, &features, &targets, &names, &cv, ScoreMode::Determination)
                .unwrap();
        assert_eq!(score.predictions.len(), 30);
        assert!(score.r2 > 0.8, "r2 = {}", score.r2);
        assert!(score.rmse > 0.0);
    }

    #[test]
    fn leave_one_out_is_deterministic() {
        let (features, targets, names) = linear_data(12);
        let config = RandomForestConfig::new(10).unwrap().with_seed(3);
        let run = || {
            cross_validation(
                &config,
                &features,
                &targets,
                &names,
                &CrossValidation::LeaveOneOut,
                ScoreMode::Determination,
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn too_few_samples_for_folds() {
        let (features, targets, names) = linear_data(3);
        let config = RandomForestConfig::new(5).unwrap();
        let cv = CrossValidation::k_fold(5, 0).unwrap();
        let err = cross_validation(&config, &features, &targets, &names, &cv, ScoreMode::Determination)
            .unwrap_err();
        assert!(matches!(err, SelectError::TooFewSamplesForFolds { .. }));
    }

    #[test]
    fn external_validation_scores_holdout() {
        let (features, targets, names) = linear_data(40);
        let forest = RandomForestConfig::new(20)
            .unwrap()
            .fit(&features[..30], &targets[..30], &names)
            .unwrap()
            .into_forest();
        let score = external_validation(
            &forest,
            &features[30..],
            &targets[30..],
            ScoreMode::SquaredCorrelation,
        )
        .unwrap();
        assert_eq!(score.predictions.len(), 10);
        assert!((0.0..=1.0).contains(&score.r2));
    }

    #[test]
    fn external_validation_width_mismatch() {
        let (features, targets, names) = linear_data(10);
        let forest = RandomForestConfig::new(3)
            .unwrap()
            .fit(&features, &targets, &names)
            .unwrap()
            .into_forest();
        let err = external_validation(&forest, &[vec![1.0]], &[1.0], ScoreMode::Determination)
            .unwrap_err();
        assert!(matches!(err, SelectError::Forest(_)));
    }
}
