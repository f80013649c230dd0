//! JSON report writer for fit, search and prediction outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{ExperimentName, SampleId};
use crate::IoError;

/// Writes experiment outputs into one directory.
///
/// Creates the output directory on construction if it does not exist.
/// Files are named `{experiment}_report.json`, `{experiment}_search.json`,
/// `{experiment}_predict.json`, and the model lives at
/// `{experiment}_model.bin`.
///
/// The writer accepts any `Serialize` payload so that it has no dependency
/// on the modeling crates.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

/// `{ "experiment": ..., <payload fields> }`.
#[derive(Serialize)]
struct Artifact<'a, T: Serialize> {
    experiment: &'a str,
    #[serde(flatten)]
    payload: &'a T,
}

#[derive(Serialize)]
struct PredictionEntry<'a> {
    id: &'a SampleId,
    predicted: f64,
}

#[derive(Serialize)]
struct PredictionPayload<'a> {
    n_samples: usize,
    predictions: Vec<PredictionEntry<'a>>,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Return the experiment name.
    #[must_use]
    pub fn experiment(&self) -> &ExperimentName {
        &self.experiment
    }

    /// Path where the fitted model should be saved.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.path_for("model.bin")
    }

    /// Write a model report to `{experiment}_report.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeJson`] | the payload cannot be encoded |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[instrument(skip_all)]
    pub fn write_report<T: Serialize>(&self, report: &T) -> Result<PathBuf, IoError> {
        self.write_json("report.json", report)
    }

    /// Write a search outcome to `{experiment}_search.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeJson`] | the payload cannot be encoded |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[instrument(skip_all)]
    pub fn write_search<T: Serialize>(&self, outcome: &T) -> Result<PathBuf, IoError> {
        self.write_json("search.json", outcome)
    }

    /// Write per-sample predictions to `{experiment}_predict.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::ShapeMismatch`] | `ids` and `predictions` differ in length |
    /// | [`IoError::SerializeJson`] | the payload cannot be encoded |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[instrument(skip_all, fields(n_samples = ids.len()))]
    pub fn write_predictions(
        &self,
        ids: &[SampleId],
        predictions: &[f64],
    ) -> Result<PathBuf, IoError> {
        if ids.len() != predictions.len() {
            return Err(IoError::ShapeMismatch {
                part: "predictions",
                expected: ids.len(),
                got: predictions.len(),
            });
        }
        let payload = PredictionPayload {
            n_samples: ids.len(),
            predictions: ids
                .iter()
                .zip(predictions)
                .map(|(id, &predicted)| PredictionEntry { id, predicted })
                .collect(),
        };
        self.write_json("predict.json", &payload)
    }

    fn path_for(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    fn write_json<T: Serialize>(&self, suffix: &str, payload: &T) -> Result<PathBuf, IoError> {
        let path = self.path_for(suffix);
        let artifact = Artifact {
            experiment: self.experiment.as_str(),
            payload,
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::SerializeJson {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "result written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Dummy {
        r2: f64,
        n_samples: usize,
    }

    fn writer(dir: &Path) -> ReportWriter {
        ReportWriter::new(dir, ExperimentName::new("exp1".to_string()).unwrap()).unwrap()
    }

    #[test]
    fn creates_nested_output_dir() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        let w = writer(&nested);
        assert!(nested.is_dir());
        assert_eq!(w.model_path(), nested.join("exp1_model.bin"));
    }

    #[test]
    fn report_has_experiment_and_payload_fields() {
        let tmp = TempDir::new().unwrap();
        let path = writer(tmp.path())
            .write_report(&Dummy { r2: 0.5, n_samples: 4 })
            .unwrap();
        assert_eq!(path, tmp.path().join("exp1_report.json"));

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["experiment"], "exp1");
        assert_eq!(value["r2"], 0.5);
        assert_eq!(value["n_samples"], 4);
    }

    #[test]
    fn predictions_written_in_order() {
        let tmp = TempDir::new().unwrap();
        let ids = vec![SampleId::new("b"), SampleId::new("a")];
        let path = writer(tmp.path()).write_predictions(&ids, &[2.0, 1.0]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["n_samples"], 2);
        assert_eq!(value["predictions"][0]["id"], "b");
        assert_eq!(value["predictions"][0]["predicted"], 2.0);
        assert_eq!(value["predictions"][1]["id"], "a");
    }

    #[test]
    fn prediction_length_mismatch() {
        let tmp = TempDir::new().unwrap();
        let err = writer(tmp.path())
            .write_predictions(&[SampleId::new("a")], &[])
            .unwrap_err();
        assert!(matches!(err, IoError::ShapeMismatch { .. }));
    }
}
