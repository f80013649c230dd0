//! The calibrate / cross-validate / validate workflow.

use canopy_io::Table;
use canopy_select::{
    ForestParams, RandomizedSearch, ScoreMode, SearchOutcome, cross_validation,
    external_validation, train_test_split,
};
use tracing::{info, instrument};

use crate::config::{CrossValidationType, HyperparameterSearch};
use crate::error::ModelError;
use crate::report::{
    Calibration, CalibrationMetrics, CrossValidationMetrics, FittedModel, ModelReport,
    ValidationMetrics,
};

/// Builder for [`RandomForestModel`].
///
/// Exactly one validation source must be set: a split fraction applied to
/// the dataset, or a separate validation table.
///
/// # Defaults
///
/// | Parameter          | Default                  |
/// |--------------------|--------------------------|
/// | `cross_validation` | `"loo"`                  |
/// | `params`           | [`ForestParams::default`] |
/// | `seed`             | 1                        |
/// | `score_mode`       | `Determination`          |
#[derive(Debug, Clone)]
pub struct RandomForestModelBuilder {
    dataset: Table,
    split_fraction: Option<f64>,
    validation: Option<Table>,
    cross_validation: String,
    params: ForestParams,
    seed: u64,
    score_mode: ScoreMode,
}

impl RandomForestModelBuilder {
    /// Hold out `fraction` of the dataset rows for validation.
    #[must_use]
    pub fn split_for_validation(mut self, fraction: f64) -> Self {
        self.split_fraction = Some(fraction);
        self
    }

    /// Validate on a separate table; the whole dataset is used for calibration.
    #[must_use]
    pub fn dataset_validation(mut self, validation: Table) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Set the cross-validation specifier: `"loo"` or a fold count.
    #[must_use]
    pub fn cross_validation(mut self, spec: impl Into<String>) -> Self {
        self.cross_validation = spec.into();
        self
    }

    /// Set the forest hyperparameters.
    #[must_use]
    pub fn with_params(mut self, params: ForestParams) -> Self {
        self.params = params;
        self
    }

    /// Set the seed for the split, fold shuffles, search sampling and forests.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set how R² is computed.
    #[must_use]
    pub fn with_score_mode(mut self, mode: ScoreMode) -> Self {
        self.score_mode = mode;
        self
    }

    /// Validate the configuration and materialize the calibration and
    /// validation tables.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyDataset`] | the dataset has no rows |
    /// | [`ModelError::NoFeatureColumns`] | the dataset has no feature columns |
    /// | [`ModelError::MissingValidationSource`] | no split fraction and no validation table |
    /// | [`ModelError::AmbiguousValidationSource`] | both were given |
    /// | [`ModelError::InvalidSplitFraction`] | fraction not finite or outside (0, 1) |
    /// | [`ModelError::Select`] | the split leaves one side empty |
    /// | [`ModelError::ValidationColumnsMismatch`] | validation features differ from the dataset's |
    /// | [`ModelError::EmptyValidationDataset`] | the validation table has no rows |
    /// | [`ModelError::InvalidCrossValidation`] | specifier is neither `"loo"` nor a fold count >= 2 |
    #[instrument(skip_all, fields(n_samples = self.dataset.n_samples(), seed = self.seed))]
    pub fn build(self) -> Result<RandomForestModel, ModelError> {
        if self.dataset.n_samples() == 0 {
            return Err(ModelError::EmptyDataset);
        }
        if self.dataset.n_features() == 0 {
            return Err(ModelError::NoFeatureColumns);
        }

        let (calibration, validation) = match (self.split_fraction, self.validation) {
            (None, None) => return Err(ModelError::MissingValidationSource),
            (Some(_), Some(_)) => return Err(ModelError::AmbiguousValidationSource),
            (Some(fraction), None) => {
                if !fraction.is_finite() || fraction <= 0.0 || fraction >= 1.0 {
                    return Err(ModelError::InvalidSplitFraction { fraction });
                }
                let (train, test) = train_test_split(self.dataset.n_samples(), fraction, self.seed)?;
                (self.dataset.select_rows(&train), self.dataset.select_rows(&test))
            }
            (None, Some(validation)) => {
                if validation.feature_names() != self.dataset.feature_names() {
                    return Err(ModelError::ValidationColumnsMismatch {
                        expected: self.dataset.feature_names().to_vec(),
                        found: validation.feature_names().to_vec(),
                    });
                }
                if validation.n_samples() == 0 {
                    return Err(ModelError::EmptyValidationDataset);
                }
                (self.dataset, validation)
            }
        };

        let cv_type: CrossValidationType = self.cross_validation.parse()?;

        info!(
            n_calibration = calibration.n_samples(),
            n_validation = validation.n_samples(),
            cv = %cv_type,
            "model configured"
        );

        Ok(RandomForestModel {
            calibration,
            validation,
            cv_type,
            params: self.params,
            seed: self.seed,
            score_mode: self.score_mode,
        })
    }
}

/// Random-forest regression workflow over a calibration and a validation table.
///
/// Each stage returns its result; the model itself is never mutated.
#[derive(Debug, Clone)]
pub struct RandomForestModel {
    calibration: Table,
    validation: Table,
    cv_type: CrossValidationType,
    params: ForestParams,
    seed: u64,
    score_mode: ScoreMode,
}

impl RandomForestModel {
    /// Start configuring a model over `dataset`.
    #[must_use]
    pub fn builder(dataset: Table) -> RandomForestModelBuilder {
        RandomForestModelBuilder {
            dataset,
            split_fraction: None,
            validation: None,
            cross_validation: "loo".to_string(),
            params: ForestParams::default(),
            seed: 1,
            score_mode: ScoreMode::default(),
        }
    }

    /// Return the calibration table.
    #[must_use]
    pub fn calibration_set(&self) -> &Table {
        &self.calibration
    }

    /// Return the validation table.
    #[must_use]
    pub fn validation_set(&self) -> &Table {
        &self.validation
    }

    /// Return the cross-validation type.
    #[must_use]
    pub fn cross_validation_type(&self) -> CrossValidationType {
        self.cv_type
    }

    /// Return the operating hyperparameters.
    #[must_use]
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the score mode.
    #[must_use]
    pub fn score_mode(&self) -> ScoreMode {
        self.score_mode
    }

    /// Return a model that operates with `params`.
    #[must_use]
    pub fn with_params(mut self, params: ForestParams) -> Self {
        self.params = params;
        self
    }

    /// Return a model that operates with the best parameters of `outcome`.
    #[must_use]
    pub fn apply_search(self, outcome: &SearchOutcome) -> Self {
        self.with_params(outcome.best_params.clone())
    }

    /// Run a randomized hyperparameter search on the calibration set.
    ///
    /// Candidates are scored with this model's cross-validation type, seed
    /// and score mode. The model's own parameters are left untouched; see
    /// [`apply_search`](Self::apply_search).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::Select`] | empty grid, zero `n_iter`, too few samples for the folds, or a failed candidate |
    #[instrument(skip_all, fields(n_iter = search.n_iter(), cv = %self.cv_type))]
    pub fn search_hyperparameters(
        &self,
        search: &HyperparameterSearch,
    ) -> Result<SearchOutcome, ModelError> {
        let space = search.to_space()?;
        let outcome = RandomizedSearch::new(search.n_iter(), self.cv_type.strategy(self.seed))?
            .with_seed(self.seed)
            .with_mode(self.score_mode)
            .run(
                &space,
                self.calibration.features(),
                self.calibration.targets(),
                self.calibration.feature_names(),
            )?;
        info!(
            best_score = outcome.best_score,
            n_trials = outcome.trials.len(),
            "hyperparameter search complete"
        );
        Ok(outcome)
    }

    /// Fit a forest on the calibration set and score it on the same rows.
    ///
    /// Calibration R² is always the coefficient of determination; the
    /// score mode applies to cross-validation and validation only.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::Forest`] | invalid parameters or training failure |
    /// | [`ModelError::Select`] | scoring failed |
    #[instrument(skip_all, fields(n_samples = self.calibration.n_samples()))]
    pub fn calibrate(&self) -> Result<Calibration, ModelError> {
        let (forest, importances) = self
            .params
            .to_config(self.seed)?
            .fit(
                self.calibration.features(),
                self.calibration.targets(),
                self.calibration.feature_names(),
            )?
            .into_parts();
        let score = external_validation(
            &forest,
            self.calibration.features(),
            self.calibration.targets(),
            ScoreMode::Determination,
        )?;
        let metrics = CalibrationMetrics {
            n_samples: self.calibration.n_samples(),
            r2: score.r2,
            rmse: score.rmse,
        };
        info!(r2 = metrics.r2, rmse = metrics.rmse, "calibration complete");
        Ok(Calibration::new(forest, importances, metrics))
    }

    /// Out-of-fold predictions on the calibration set.
    ///
    /// Each fold fits a fresh forest from the operating parameters, so this
    /// does not require [`calibrate`](Self::calibrate) to have run.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::Select`] | fewer samples than folds, or a fold failed |
    /// | [`ModelError::Forest`] | invalid parameters |
    #[instrument(skip_all, fields(cv = %self.cv_type, n_samples = self.calibration.n_samples()))]
    pub fn cross_validate(&self) -> Result<CrossValidationMetrics, ModelError> {
        let config = self.params.to_config(self.seed)?;
        let cv = self.cv_type.strategy(self.seed);
        let score = cross_validation(
            &config,
            self.calibration.features(),
            self.calibration.targets(),
            self.calibration.feature_names(),
            &cv,
            self.score_mode,
        )?;
        Ok(CrossValidationMetrics {
            r2: score.r2,
            rmse: score.rmse,
            method: cv.label(),
            predicted_values: score.predictions,
        })
    }

    /// Score a calibrated forest on the validation set.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Select`] if prediction or scoring fails.
    #[instrument(skip_all, fields(n_samples = self.validation.n_samples()))]
    pub fn validate(&self, calibration: &Calibration) -> Result<ValidationMetrics, ModelError> {
        let score = external_validation(
            calibration.forest(),
            self.validation.features(),
            self.validation.targets(),
            self.score_mode,
        )?;
        Ok(ValidationMetrics {
            r2: score.r2,
            rmse: score.rmse,
            n_samples: self.validation.n_samples(),
            predicted_values: score.predictions,
        })
    }

    /// Run calibration, cross-validation and validation in order.
    ///
    /// # Errors
    ///
    /// Returns the first stage error unchanged.
    #[instrument(skip_all)]
    pub fn create_model(&self) -> Result<FittedModel, ModelError> {
        let calibration = self.calibrate()?;
        let cross_validation = self.cross_validate()?;
        let validation = self.validate(&calibration)?;

        info!(
            calibration_r2 = calibration.metrics().r2,
            cv_r2 = cross_validation.r2,
            validation_r2 = validation.r2,
            "model created"
        );

        let report = ModelReport {
            calibration: calibration.metrics().clone(),
            cross_validation,
            validation,
        };
        Ok(FittedModel::new(calibration, report))
    }
}

#[cfg(test)]
mod tests {
    use canopy_io::SampleId;

    use super::*;

    fn table(n: usize, offset: usize) -> Table {
        let ids = (0..n).map(|i| SampleId::new(format!("S{}", i + offset))).collect();
        let features: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let x = (i + offset) as f64;
                vec![x, (x * 0.7).sin()]
            })
            .collect();
        let targets = features.iter().map(|r| 2.0 * r[0] + r[1]).collect();
        Table::new(ids, "y", targets, vec!["x".into(), "s".into()], features).unwrap()
    }

    #[test]
    fn requires_a_validation_source() {
        let err = RandomForestModel::builder(table(10, 0)).build().unwrap_err();
        assert!(matches!(err, ModelError::MissingValidationSource));
    }

    #[test]
    fn rejects_both_validation_sources() {
        let err = RandomForestModel::builder(table(10, 0))
            .split_for_validation(0.2)
            .dataset_validation(table(4, 10))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::AmbiguousValidationSource));
    }

    #[test]
    fn rejects_bad_fractions() {
        for fraction in [0.0, 1.0, -0.5, 1.5, f64::NAN, f64::INFINITY] {
            let err = RandomForestModel::builder(table(10, 0))
                .split_for_validation(fraction)
                .build()
                .unwrap_err();
            assert!(
                matches!(err, ModelError::InvalidSplitFraction { .. }),
                "{fraction} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_cross_validation() {
        let err = RandomForestModel::builder(table(10, 0))
            .split_for_validation(0.2)
            .cross_validation("abc")
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidCrossValidation { .. }));
    }

    #[test]
    fn split_sizes() {
        let model = RandomForestModel::builder(table(20, 0))
            .split_for_validation(0.25)
            .build()
            .unwrap();
        assert_eq!(model.calibration_set().n_samples(), 15);
        assert_eq!(model.validation_set().n_samples(), 5);
        assert_eq!(model.cross_validation_type(), CrossValidationType::LeaveOneOut);
    }

    #[test]
    fn validation_columns_must_match() {
        let other = Table::new(
            vec![SampleId::new("V0")],
            "y",
            vec![1.0],
            vec!["x".into(), "other".into()],
            vec![vec![1.0, 2.0]],
        )
        .unwrap();
        let err = RandomForestModel::builder(table(10, 0))
            .dataset_validation(other)
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::ValidationColumnsMismatch { .. }));
    }

    #[test]
    fn apply_search_replaces_params() {
        let model = RandomForestModel::builder(table(10, 0))
            .split_for_validation(0.2)
            .build()
            .unwrap();
        let best = ForestParams {
            n_estimators: 7,
            ..ForestParams::default()
        };
        let outcome = SearchOutcome {
            best_params: best.clone(),
            best_score: 0.5,
            trials: Vec::new(),
        };
        let applied = model.clone().apply_search(&outcome);
        assert_eq!(applied.params(), &best);
        assert_eq!(model.params(), &ForestParams::default());
    }
}
