//! # Recalib-Lib: Calibration Uncertainty for Gravitational-Wave Strain
//!
//! `recalib-lib` corrects frequency-domain detector strain for instrumental
//! calibration error and prepares the matching prior configuration for a
//! Bayesian inference run.
//!
//! ## Core Features
//!
//! - **Cubic-spline model**: amplitude and phase corrections anchored at
//!   log-spaced control frequencies, splined onto the strain's grid
//! - **Sampler binding**: calibration parameters are picked out of a sampler's
//!   full parameter vector by name prefix (`recalib_` by default)
//! - **Config expansion**: a short `[calibration]` section becomes one Gaussian
//!   prior section per control point, parameter kind, and interferometer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use recalib_lib::{recalibrate_strain, CubicSpline, FrequencySeries};
//! use num_complex::Complex64;
//!
//! let mut model = CubicSpline::new(20.0, 1024.0, 10)?.with_ifo_name("H1");
//!
//! let strain = FrequencySeries::from_delta_f(vec![Complex64::new(1.0, 0.0); 4097], 0.25)?;
//!
//! // One sample from the sampler: calibration parameters plus everything else.
//! let mut sample: HashMap<String, f64> = HashMap::new();
//! sample.insert("mass1".into(), 30.0);
//! for i in 0..10 {
//!     sample.insert(format!("recalib_amplitude_H1_{}", i), 0.02);
//!     sample.insert(format!("recalib_phase_H1_{}", i), -0.01);
//! }
//!
//! let corrected = recalibrate_strain(&mut model, &strain, &sample)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Model Support
//!
//! - `none`: identity, no parameters
//! - `cubic_spline`: spline amplitude/phase correction

// ================================================================================================
// MODULES
// ================================================================================================

pub mod calibration;
pub mod error;
pub mod model_params;
pub mod models;
pub mod plot;
pub mod priors;

// ================================================================================================
// IMPORTS
// ================================================================================================

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Result;

use crate::calibration::config::section;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

pub use calibration::{
    config::{load_config, parse_config},
    types::FrequencySeries,
};
pub use error::RecalibError;
pub use model_params::{RecalibParams, UpdatePolicy, DEFAULT_PREFIX};
pub use models::{
    cubic_spline::{CubicSpline, CubicSplineConfig, SmoothingSpline},
    model_from_config,
    none::NoCalibration,
    traits::Recalibrate,
    ALL_MODELS,
};
pub use plot::plot_correction;
pub use priors::{
    calibration_config_expander, draw_calibration_parameters, expand_calibration_table,
    ExpandedConfig, ExpanderOptions, GaussianPrior,
};

/// Recalibrate `strain` with the calibration parameters found in one sampler
/// draw.
///
/// Equivalent to `model.map_to_adjust(strain, DEFAULT_PREFIX, sample)`: only
/// keys starting with `recalib_` are bound, everything else in `sample` is
/// ignored.
pub fn recalibrate_strain(
    model: &mut dyn Recalibrate,
    strain: &FrequencySeries,
    sample: &HashMap<String, f64>,
) -> Result<FrequencySeries> {
    model.map_to_adjust(strain, DEFAULT_PREFIX, sample)
}

/// Builds one model per interferometer from the named section of a config
/// document.
pub fn models_from_config(
    doc: &toml::Table,
    section_name: &str,
    ifos: &[&str],
) -> Result<BTreeMap<String, Box<dyn Recalibrate>>> {
    let table = section(doc, section_name)?;
    ifos.iter()
        .map(|ifo| -> Result<(String, Box<dyn Recalibrate>)> {
            Ok((ifo.to_string(), model_from_config(table, section_name, ifo)?))
        })
        .collect()
}

/// Expand a human-readable calibration config file into prior sections.
///
/// Interferometer labels are inferred from the `[calibration]` keys; use
/// [`calibration_config_expander`] with [`ExpanderOptions`] to list them
/// explicitly. When `output` is given the expanded document is written there,
/// but only once the whole expansion has succeeded.
///
/// # Errors
///
/// * [`RecalibError::UnknownModel`] for an unsupported `{ifo}_model`
/// * [`RecalibError::NotImplemented`] when `{ifo}_calibration_envelope` is set
/// * [`RecalibError::MissingOption`] / [`RecalibError::InvalidOption`] for
///   absent or malformed options
pub fn expand_calibration_config(input: &Path, output: Option<&Path>) -> Result<ExpandedConfig> {
    calibration_config_expander(input, output, &ExpanderOptions::default())
}
