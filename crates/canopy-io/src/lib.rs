//! File I/O, validation, and serialization for the canopy workflow.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ColumnLayout, ColumnSelector, ExperimentName, FeatureTable, SampleId, Table};
pub use error::IoError;
pub use reader::TableReader;
pub use writer::ReportWriter;
