//! Error conditions raised by the recalibration models and the config expander.
//!
//! Library functions return [`anyhow::Result`]; the variants below are wrapped
//! into the `anyhow::Error`, so callers that need to branch on the failure kind
//! can use `err.downcast_ref::<RecalibError>()`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecalibError {
    /// A calibration parameter required by the model has never been supplied.
    #[error("Missing calibration parameter '{0}'")]
    MissingParameter(String),

    #[error("Calibration model \"{0}\" not implemented")]
    UnknownModel(String),

    #[error("{0} not yet implemented")]
    NotImplemented(String),

    #[error("Spline fit failed: {0}")]
    SplineFit(String),

    #[error("Invalid calibration model configuration: {0}")]
    InvalidModelConfig(String),

    #[error("Invalid frequency grid: {0}")]
    InvalidFrequencyGrid(String),

    /// Strict updates must carry every parameter the model needs.
    #[error("Incomplete calibration update, missing: {}", missing.join(", "))]
    IncompleteUpdate { missing: Vec<String> },

    #[error("Missing section [{0}]")]
    MissingSection(String),

    #[error("Missing option '{key}' in section [{section}]")]
    MissingOption { section: String, key: String },

    #[error("Invalid value for option '{key}': {value}")]
    InvalidOption { key: String, value: String },
}
