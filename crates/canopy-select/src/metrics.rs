//! Regression metrics.

use crate::error::SelectError;

/// How the R² figure of a prediction set is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Coefficient of determination, `1 - SS_res / SS_tot`.
    #[default]
    Determination,
    /// Squared Pearson correlation between observed and predicted values.
    SquaredCorrelation,
}

impl ScoreMode {
    /// Score `predicted` against `observed` under this mode.
    ///
    /// # Errors
    ///
    /// See [`r2_score`] and [`squared_correlation`].
    pub fn score(self, observed: &[f64], predicted: &[f64]) -> Result<f64, SelectError> {
        match self {
            ScoreMode::Determination => r2_score(observed, predicted),
            ScoreMode::SquaredCorrelation => squared_correlation(observed, predicted),
        }
    }
}

fn check_lengths(observed: &[f64], predicted: &[f64]) -> Result<(), SelectError> {
    if observed.len() != predicted.len() {
        return Err(SelectError::LengthMismatch {
            n_observed: observed.len(),
            n_predicted: predicted.len(),
        });
    }
    if observed.is_empty() {
        return Err(SelectError::EmptyScore);
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Coefficient of determination.
///
/// A constant `observed` vector scores 1.0 when predicted exactly and 0.0
/// otherwise.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SelectError::LengthMismatch`] | slices differ in length |
/// | [`SelectError::EmptyScore`] | slices are empty |
pub fn r2_score(observed: &[f64], predicted: &[f64]) -> Result<f64, SelectError> {
    check_lengths(observed, predicted)?;
    let mean_obs = mean(observed);
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean_obs).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Root mean squared error.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SelectError::LengthMismatch`] | slices differ in length |
/// | [`SelectError::EmptyScore`] | slices are empty |
pub fn rmse(observed: &[f64], predicted: &[f64]) -> Result<f64, SelectError> {
    check_lengths(observed, predicted)?;
    let mse = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum::<f64>()
        / observed.len() as f64;
    Ok(mse.sqrt())
}

/// Squared Pearson correlation coefficient.
///
/// Returns 0.0 when either side has zero variance.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SelectError::LengthMismatch`] | slices differ in length |
/// | [`SelectError::EmptyScore`] | slices are empty |
pub fn squared_correlation(observed: &[f64], predicted: &[f64]) -> Result<f64, SelectError> {
    check_lengths(observed, predicted)?;
    let mean_obs = mean(observed);
    let mean_pred = mean(predicted);

    let (mut cov, mut var_obs, mut var_pred) = (0.0, 0.0, 0.0);
    for (o, p) in observed.iter().zip(predicted) {
        let (d_o, d_p) = (o - mean_obs, p - mean_pred);
        cov += d_o * d_p;
        var_obs += d_o * d_o;
        var_pred += d_p * d_p;
    }

    if var_obs == 0.0 || var_pred == 0.0 {
        return Ok(0.0);
    }
    Ok(cov * cov / (var_obs * var_pred))
}
