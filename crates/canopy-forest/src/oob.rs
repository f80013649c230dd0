//! Out-of-bag (OOB) evaluation for the random forest regressor.

use crate::error::ForestError;
use crate::tree::DecisionTree;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone)]
pub struct OobScore {
    /// Coefficient of determination over the samples with at least one OOB tree.
    pub r2: f64,
    /// Root mean squared error over the same samples.
    pub rmse: f64,
    /// Number of samples that had at least one OOB tree.
    pub n_oob_samples: usize,
    /// Per-sample OOB prediction, `None` when every tree saw the sample.
    pub predictions: Vec<Option<f64>>,
}

/// Compute out-of-bag predictions, R² and RMSE.
///
/// Each sample is predicted by averaging only the trees whose bootstrap
/// did not contain it. Samples with no OOB tree are skipped.
pub(crate) fn compute_oob(
    trees: &[DecisionTree],
    features: &[Vec<f64>],
    targets: &[f64],
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, ForestError> {
    let n_samples = features.len();
    let mut sums = vec![0.0f64; n_samples];
    let mut counts = vec![0usize; n_samples];

    for (tree, oob_indices) in trees.iter().zip(oob_indices_per_tree) {
        for &sample_idx in oob_indices {
            sums[sample_idx] += tree.predict(&features[sample_idx])?;
            counts[sample_idx] += 1;
        }
    }

    let predictions: Vec<Option<f64>> = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| (c > 0).then(|| s / c as f64))
        .collect();

    let pairs: Vec<(f64, f64)> = predictions
        .iter()
        .zip(targets)
        .filter_map(|(p, &y)| p.map(|p| (p, y)))
        .collect();
    let n_oob_samples = pairs.len();
    if n_oob_samples == 0 {
        return Err(ForestError::OobEvaluationFailed {
            reason: "no sample has any OOB tree".to_string(),
        });
    }

    let n = n_oob_samples as f64;
    let mean = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let ss_res: f64 = pairs.iter().map(|(p, y)| (y - p).powi(2)).sum();
    let ss_tot: f64 = pairs.iter().map(|(_, y)| (y - mean).powi(2)).sum();

    // A constant target has no variance to explain.
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };
    let rmse = (ss_res / n).sqrt();

    Ok(OobScore {
        r2,
        rmse,
        n_oob_samples,
        predictions,
    })
}
