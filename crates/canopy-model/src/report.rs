//! Stage results and the combined model report.

use canopy_forest::{RandomForest, RankedFeature};

/// Fit quality of the calibrated forest on its own training rows.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CalibrationMetrics {
    /// Number of calibration rows.
    pub n_samples: usize,
    /// Coefficient of determination on the calibration rows.
    #[serde(rename = "R2")]
    pub r2: f64,
    /// RMSE on the calibration rows.
    #[serde(rename = "RMSE")]
    pub rmse: f64,
}

/// Out-of-fold performance on the calibration rows.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CrossValidationMetrics {
    /// Pooled out-of-fold R².
    #[serde(rename = "R2")]
    pub r2: f64,
    /// Pooled out-of-fold RMSE.
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    /// `"LOO"` or `"<k>-fold"`.
    pub method: String,
    /// One out-of-fold prediction per calibration row.
    pub predicted_values: Vec<f64>,
}

/// Performance of the calibrated forest on the held-out rows.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidationMetrics {
    /// R² on the validation rows.
    #[serde(rename = "R2")]
    pub r2: f64,
    /// RMSE on the validation rows.
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    /// Number of validation rows.
    pub n_samples: usize,
    /// One prediction per validation row.
    pub predicted_values: Vec<f64>,
}

/// Metrics of every stage of [`RandomForestModel::create_model`](crate::RandomForestModel::create_model).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ModelReport {
    /// Calibration-set fit.
    pub calibration: CalibrationMetrics,
    /// Cross-validation on the calibration set.
    pub cross_validation: CrossValidationMetrics,
    /// External validation.
    pub validation: ValidationMetrics,
}

/// A forest fitted on the calibration rows, with its calibration metrics.
#[derive(Debug, Clone)]
pub struct Calibration {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    metrics: CalibrationMetrics,
}

impl Calibration {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        metrics: CalibrationMetrics,
    ) -> Self {
        Self {
            forest,
            importances,
            metrics,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Return the calibration metrics.
    #[must_use]
    pub fn metrics(&self) -> &CalibrationMetrics {
        &self.metrics
    }

    /// Feature importances of the fitted forest, most important first.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Consume the calibration and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }
}

/// Output of the full pipeline: the calibrated forest and every stage's metrics.
#[derive(Debug, Clone)]
pub struct FittedModel {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    report: ModelReport,
}

impl FittedModel {
    pub(crate) fn new(calibration: Calibration, report: ModelReport) -> Self {
        Self {
            forest: calibration.forest,
            importances: calibration.importances,
            report,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Feature importances of the calibrated forest, most important first.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Borrow the report.
    #[must_use]
    pub fn report(&self) -> &ModelReport {
        &self.report
    }

    /// Split into the forest and the report.
    #[must_use]
    pub fn into_parts(self) -> (RandomForest, ModelReport) {
        (self.forest, self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_keys() {
        let report = ModelReport {
            calibration: CalibrationMetrics {
                n_samples: 3,
                r2: 0.9,
                rmse: 0.1,
            },
            cross_validation: CrossValidationMetrics {
                r2: 0.7,
                rmse: 0.3,
                method: "LOO".to_string(),
                predicted_values: vec![1.0, 2.0, 3.0],
            },
            validation: ValidationMetrics {
                r2: 0.6,
                rmse: 0.4,
                n_samples: 1,
                predicted_values: vec![4.0],
            },
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["calibration"]["n_samples"], 3);
        assert_eq!(value["calibration"]["R2"], 0.9);
        assert_eq!(value["cross_validation"]["method"], "LOO");
        assert_eq!(value["cross_validation"]["predicted_values"][2], 3.0);
        assert_eq!(value["validation"]["RMSE"], 0.4);
        assert_eq!(value["validation"]["n_samples"], 1);
    }
}
