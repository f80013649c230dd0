//! Random-forest regression workflow.
//!
//! A [`RandomForestModel`] holds a calibration and a validation table and
//! runs calibration, cross-validation, external validation and randomized
//! hyperparameter search on them.
//!
//! ```no_run
//! use canopy_io::TableReader;
//! use canopy_model::RandomForestModel;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = TableReader::new(std::path::Path::new("soil.csv")).read()?;
//! let model = RandomForestModel::builder(table)
//!     .split_for_validation(0.25)
//!     .cross_validation("5")
//!     .build()?;
//! let fitted = model.create_model()?;
//! println!("validation R2 = {}", fitted.report().validation.r2);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod model;
mod report;

pub use config::{CrossValidationType, HyperparameterSearch};
pub use error::ModelError;
pub use model::{RandomForestModel, RandomForestModelBuilder};
pub use report::{
    Calibration, CalibrationMetrics, CrossValidationMetrics, FittedModel, ModelReport,
    ValidationMetrics,
};
