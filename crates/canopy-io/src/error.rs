//! I/O error types for canopy-io.

use std::path::PathBuf;

/// Errors from CSV reading, table construction, and report writing.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a named column is absent from the header.
    #[error("column \"{column}\" not found in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The column that was requested.
        column: String,
    },

    /// Returned when a positional column is beyond the header width.
    #[error("column position {position} out of range in {path} ({n_columns} columns)")]
    ColumnOutOfRange {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based position requested.
        position: usize,
        /// Number of columns in the header.
        n_columns: usize,
    },

    /// Returned when the same header name appears twice.
    #[error("duplicate column \"{column}\" in {path}")]
    DuplicateColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated column name.
        column: String,
    },

    /// Returned when one column is selected for two roles (id, target, feature).
    #[error("column \"{column}\" is selected for more than one role")]
    ConflictingColumns {
        /// The column selected twice.
        column: String,
    },

    /// Returned when no feature column remains after selecting id and target.
    #[error("no feature columns in {path}")]
    NoFeatureColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} (id {sample_id}) has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Identifier of the offending row.
        sample_id: String,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell value is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Name of the offending column.
        column: String,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when an identifier cell is empty.
    #[error("empty sample id in {path} at row {row_index}")]
    EmptySampleId {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
    },

    /// Returned when the same sample ID appears more than once.
    #[error("duplicate sample id \"{sample_id}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicateSampleId {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated identifier.
        sample_id: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when an in-memory table is built from vectors of different lengths.
    #[error("table {part} has length {got}, expected {expected}")]
    ShapeMismatch {
        /// Which part of the table is inconsistent.
        part: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a value cannot be encoded as JSON.
    #[error("cannot encode JSON for {path}")]
    SerializeJson {
        /// Destination path.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
