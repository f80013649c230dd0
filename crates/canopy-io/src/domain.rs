//! Domain types for canopy-io.

use crate::IoError;

/// A sample (row) identifier taken from the id column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct SampleId(String);

impl SampleId {
    /// Create a new sample ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the sample ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Selects a CSV column either by header name or by zero-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    /// Column with this header name.
    Named(String),
    /// Column at this zero-based position.
    Position(usize),
}

/// Which columns hold the identifier, the target and the features.
///
/// # Defaults
///
/// [`ColumnLayout::positional`]: id in column 0, target in column 1,
/// every remaining column is a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub(crate) id: ColumnSelector,
    pub(crate) target: ColumnSelector,
    pub(crate) features: Option<Vec<String>>,
}

impl ColumnLayout {
    /// Fixed-position layout: id, target, then features.
    #[must_use]
    pub fn positional() -> Self {
        Self {
            id: ColumnSelector::Position(0),
            target: ColumnSelector::Position(1),
            features: None,
        }
    }

    /// Select the id and target columns by header name.
    ///
    /// Features default to every other column, in header order.
    #[must_use]
    pub fn named(id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: ColumnSelector::Named(id.into()),
            target: ColumnSelector::Named(target.into()),
            features: None,
        }
    }

    /// Use exactly these feature columns, in this order.
    #[must_use]
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = Some(features);
        self
    }

    /// Return the id column selector.
    #[must_use]
    pub fn id(&self) -> &ColumnSelector {
        &self.id
    }

    /// Return the target column selector.
    #[must_use]
    pub fn target(&self) -> &ColumnSelector {
        &self.target
    }

    /// Return the explicit feature list, if any.
    #[must_use]
    pub fn features(&self) -> Option<&[String]> {
        self.features.as_deref()
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::positional()
    }
}

fn check_len(part: &'static str, expected: usize, got: usize) -> Result<(), IoError> {
    if expected != got {
        return Err(IoError::ShapeMismatch { part, expected, got });
    }
    Ok(())
}

/// A feature matrix with row identifiers, used as prediction input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    ids: Vec<SampleId>,
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Create a feature table from parallel vectors.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ShapeMismatch`] if `features` does not have one row
    /// per id, or a row does not have one value per feature name.
    pub fn new(
        ids: Vec<SampleId>,
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
    ) -> Result<Self, IoError> {
        check_len("rows", ids.len(), features.len())?;
        for row in &features {
            check_len("row width", feature_names.len(), row.len())?;
        }
        Ok(Self {
            ids,
            feature_names,
            features,
        })
    }

    /// Return the sample IDs.
    #[must_use]
    pub fn ids(&self) -> &[SampleId] {
        &self.ids
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.ids.len()
    }
}

/// A regression dataset: identifiers, one target column and feature columns.
///
/// Rows are aligned: `ids[i]`, `targets[i]` and `features[i]` describe the
/// same sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    ids: Vec<SampleId>,
    target_name: String,
    targets: Vec<f64>,
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
}

impl Table {
    /// Create a table from parallel vectors.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ShapeMismatch`] if the targets or feature rows do not
    /// line up with the ids, or a row does not have one value per feature name.
    pub fn new(
        ids: Vec<SampleId>,
        target_name: impl Into<String>,
        targets: Vec<f64>,
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
    ) -> Result<Self, IoError> {
        check_len("targets", ids.len(), targets.len())?;
        check_len("rows", ids.len(), features.len())?;
        for row in &features {
            check_len("row width", feature_names.len(), row.len())?;
        }
        Ok(Self {
            ids,
            target_name: target_name.into(),
            targets,
            feature_names,
            features,
        })
    }

    /// Return a new table holding the rows at `indices`, in that order.
    ///
    /// Indices must be in range.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            ids: indices.iter().map(|&i| self.ids[i].clone()).collect(),
            target_name: self.target_name.clone(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
        }
    }

    /// Return the sample IDs.
    #[must_use]
    pub fn ids(&self) -> &[SampleId] {
        &self.ids
    }

    /// Return the target column name.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Return the target values.
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.ids.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}
