//! Prediction methods for the random forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::ForestError;
use crate::forest::RandomForest;

impl RandomForest {
    /// Predict the response for a single sample.
    ///
    /// Returns the mean of the per-tree predictions.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.predict_unchecked(sample))
            .sum();
        Ok(total / self.trees.len() as f64)
    }

    /// Predict responses for a batch of samples in parallel.
    ///
    /// Output order matches input order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names, in training column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Borrow the individual trees.
    #[must_use]
    pub fn trees(&self) -> &[crate::tree::DecisionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use crate::{ForestError, RandomForestConfig};

    fn fitted() -> crate::RandomForest {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 1.0]).collect();
        let targets: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 3.0 }).collect();
        let names = vec!["a".to_string(), "b".to_string()];
        RandomForestConfig::new(8)
            .unwrap()
            .with_seed(3)
            .fit(&features, &targets, &names)
            .unwrap()
            .into_forest()
    }

    #[test]
    fn prediction_is_mean_of_trees() {
        let forest = fitted();
        let sample = [4.5, 1.0];
        let expected: f64 = forest
            .trees()
            .iter()
            .map(|t| t.predict(&sample).unwrap())
            .sum::<f64>()
            / forest.n_trees() as f64;
        assert!((forest.predict(&sample).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn batch_matches_individual() {
        let forest = fitted();
        let samples: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 + 0.25, 1.0]).collect();
        let batch = forest.predict_batch(&samples).unwrap();
        for (sample, b) in samples.iter().zip(&batch) {
            assert_eq!(forest.predict(sample).unwrap(), *b);
        }
    }

    #[test]
    fn wrong_width_rejected() {
        let forest = fitted();
        assert!(matches!(
            forest.predict(&[1.0]),
            Err(ForestError::PredictionFeatureMismatch { expected: 2, got: 1 })
        ));
        assert!(forest.predict_batch(&[vec![1.0, 1.0], vec![1.0]]).is_err());
    }

    #[test]
    fn accessors() {
        let forest = fitted();
        assert_eq!(forest.n_trees(), 8);
        assert_eq!(forest.n_features(), 2);
        assert_eq!(forest.feature_names(), ["a", "b"]);
    }
}
