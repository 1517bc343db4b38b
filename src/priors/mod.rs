pub mod expander;
pub mod types;

pub use expander::{
    calibration_config_expander, expand_calibration_table, infer_interferometers, ExpanderOptions,
};
pub use types::{draw_calibration_parameters, ExpandedConfig, GaussianPrior};
