//! Model persistence via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::RandomForest;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope around a serialized forest.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    feature_names: Vec<String>,
    forest: RandomForest,
}

impl RandomForest {
    /// Encode the forest in its versioned binary envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::SerializeModel`] if bincode encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ForestError> {
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            feature_names: self.feature_names.clone(),
            forest: self.clone(),
        };
        bincode::serialize(&envelope).map_err(|source| ForestError::SerializeModel { source })
    }

    /// Save the model to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        std::fs::write(path, &bytes).map_err(|source| ForestError::WriteModel {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.trees.len(),
            "model saved"
        );
        Ok(())
    }

    /// Load a model from a binary file written by [`RandomForest::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | file read failed |
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|source| ForestError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|source| ForestError::DeserializeModel {
                path: path.to_path_buf(),
                source,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            "model loaded"
        );
        Ok(envelope.forest)
    }
}
