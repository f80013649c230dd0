use rand::Rng;

use crate::node::{FeatureIndex, Impurity, NodeStats};

fn squared_error(sum: f64, sum_sq: f64, n_samples: usize) -> Impurity {
    NodeStats::from_sums(sum, sum_sq, n_samples).impurity
}

/// Threshold between two adjacent sorted values, with `lo < hi`.
///
/// The midpoint rounds onto `hi` when the values are one ULP apart; `lo` is
/// used then so that `x <= threshold` still separates them.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi { lo } else { mid }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Weighted impurity decrease from this split (MDI formula).
    pub(crate) impurity_decrease: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best split among a random subset of features.
///
/// For each of `max_features` randomly chosen features, sorts the
/// `(value, target)` pairs, scans left-to-right while moving running sums
/// from the right child to the left child, and keeps the split with the
/// largest weighted decrease in squared error.
///
/// Returns `None` when no valid split exists (all values identical,
/// or split would violate `min_samples_leaf`).
///
/// # Column-major layout
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
/// `sample_indices` are indices into these inner Vecs.
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    sample_indices: &[usize],
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let (parent_sum, parent_sum_sq) = sample_indices
        .iter()
        .fold((0.0, 0.0), |(s, sq), &si| (s + targets[si], sq + targets[si] * targets[si]));
    let parent_impurity = squared_error(parent_sum, parent_sum_sq, n_samples);

    // Partial Fisher-Yates: shuffle only the first `max_features` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }
    let selected_features = &feature_order[..take];

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in selected_features {
        let feat_col = &features[feat_idx];

        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        let mut left_sum_sq = 0.0;

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let y = targets[si];
            left_sum += y;
            left_sum_sq += y * y;

            let n_left = i + 1;
            let n_right = n_samples - n_left;

            // No boundary between equal values.
            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let left_impurity = squared_error(left_sum, left_sum_sq, n_left);
            let right_impurity =
                squared_error(parent_sum - left_sum, parent_sum_sq - left_sum_sq, n_right);

            let decrease = (n_samples as f64) * parent_impurity.value()
                - (n_left as f64) * left_impurity.value()
                - (n_right as f64) * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), midpoint(val_i, val_next)));
            }
        }
    }

    let (best_feature, threshold) = best?;

    let feat_col = &features[best_feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);
    if left_indices.is_empty() || right_indices.is_empty() {
        return None;
    }

    Some(SplitResult {
        feature: best_feature,
        threshold,
        impurity_decrease: best_decrease.max(0.0),
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{find_best_split, midpoint};

    #[test]
    fn midpoint_of_adjacent_floats_stays_below_upper() {
        let lo = 1.0 + f64::EPSILON;
        let hi = 1.0 + 2.0 * f64::EPSILON;
        let t = midpoint(lo, hi);
        assert!(t >= lo && t < hi, "threshold {t} must separate {lo} and {hi}");
        assert!((midpoint(2.0, 4.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn adjacent_float_values_are_separated() {
        let features = vec![vec![1.0 + f64::EPSILON, 1.0 + 2.0 * f64::EPSILON]];
        let targets = vec![0.0, 10.0];
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let split = find_best_split(&features, &targets, &[0, 1], 1, 1, &mut rng)
            .expect("two distinct values should split");
        assert_eq!(split.left_indices, vec![0]);
        assert_eq!(split.right_indices, vec![1]);
    }

    #[test]
    fn step_function_finds_gap() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let targets = vec![0.0, 0.0, 0.0, 5.0, 5.0, 5.0];
        let sample_indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(&features, &targets, &sample_indices, 1, 1, &mut rng)
            .expect("should find a split");
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < 1e-12);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
        // Parent SSE is 6 * 6.25 = 37.5, children are pure.
        assert!((split.impurity_decrease - 37.5).abs() < 1e-9);
    }

    #[test]
    fn picks_informative_feature() {
        // Feature 0 is noise, feature 1 separates the targets.
        let features = vec![
            vec![0.3, 0.1, 0.4, 0.2, 0.5, 0.6],
            vec![1.0, 1.0, 1.0, 9.0, 9.0, 9.0],
        ];
        let targets = vec![1.0, 1.1, 0.9, 7.0, 7.2, 6.8];
        let sample_indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let split = find_best_split(&features, &targets, &sample_indices, 2, 1, &mut rng)
            .expect("should find a split");
        assert_eq!(split.feature.index(), 1);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0, 5.0, 5.0, 5.0]];
        let targets = vec![0.0, 1.0, 2.0, 3.0];
        let sample_indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert!(find_best_split(&features, &targets, &sample_indices, 1, 1, &mut rng).is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let features = vec![vec![1.0, 10.0]];
        let targets = vec![0.0, 1.0];
        let sample_indices: Vec<usize> = (0..2).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert!(find_best_split(&features, &targets, &sample_indices, 1, 2, &mut rng).is_none());
    }
}
