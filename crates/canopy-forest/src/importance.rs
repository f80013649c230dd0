//! Feature importance aggregation across trees.

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 across all features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Sum per-tree MDI importances, normalize them, and rank descending.
///
/// Ties keep the original column order.
pub(crate) fn aggregate_importances(per_tree: &[Vec<f64>], names: &[String]) -> Vec<RankedFeature> {
    if per_tree.is_empty() || names.is_empty() {
        return vec![];
    }

    let mut totals = vec![0.0f64; names.len()];
    for tree_imp in per_tree {
        for (total, &val) in totals.iter_mut().zip(tree_imp) {
            *total += val;
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(&totals)
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}
