//! Expansion of a human-authored `[calibration]` section into per-parameter
//! prior sections.
//!
//! Input options are `{ifo}_{field}`:
//!
//! ```toml
//! [calibration]
//! H1_model = "cubic_spline"
//! H1_n_points = 5
//! H1_amplitude_sigma = 0.1
//! H1_phase_sigma = 0.2
//! ```
//!
//! For every control point `i` and parameter kind the expander registers
//! `recalib_{kind}_{ifo}_{i}` in `[variable_params]` and, unless the section
//! already exists, adds
//!
//! ```toml
//! [prior-recalib_amplitude_H1_0]
//! name = "gaussian"
//! recalib_amplitude_H1_0_mean = 0.0
//! recalib_amplitude_H1_0_var = 0.01
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use log::{debug, info, warn};
use toml::{Table, Value};

use super::types::{
    prior_section_name, ExpandedConfig, GaussianPrior, CALIBRATION_SECTION,
    VARIABLE_PARAMS_SECTION,
};
use crate::calibration::config::{load_config, option_f64, option_str, option_usize, section};
use crate::error::RecalibError;
use crate::model_params::DEFAULT_PREFIX;
use crate::models::cubic_spline::{spline::MIN_KNOTS, CubicSpline};
use crate::models::none::NoCalibration;

const SPLINE_PARAMETERS: [&str; 2] = ["amplitude", "phase"];

/// Options controlling the expansion.
#[derive(Debug, Clone, Default)]
pub struct ExpanderOptions {
    /// Interferometer labels to expand. When `None` the labels are inferred
    /// from the text before the first underscore of each `[calibration]` key,
    /// which cannot represent labels that themselves contain an underscore.
    pub interferometers: Option<Vec<String>>,
}

impl ExpanderOptions {
    pub fn with_interferometers<I, S>(ifos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interferometers: Some(ifos.into_iter().map(Into::into).collect()),
        }
    }
}

/// Reads `input`, expands it, and writes the result to `output` when given.
///
/// Nothing is written unless the whole expansion succeeds.
pub fn calibration_config_expander(
    input: &Path,
    output: Option<&Path>,
    options: &ExpanderOptions,
) -> Result<ExpandedConfig> {
    let doc = load_config(input)?;
    let expanded = expand_calibration_table(doc, options)?;
    if let Some(path) = output {
        expanded.write(path)?;
        info!("expanded calibration config written to {}", path.display());
    }
    Ok(expanded)
}

/// Expands an in-memory config document.
pub fn expand_calibration_table(mut doc: Table, options: &ExpanderOptions) -> Result<ExpandedConfig> {
    let calib = section(&doc, CALIBRATION_SECTION)?.clone();

    let ifos: Vec<String> = match &options.interferometers {
        Some(ifos) => ifos.clone(),
        None => infer_interferometers(&calib),
    };
    debug!("expanding calibration for interferometers {:?}", ifos);

    let mut variable_params = match doc.remove(VARIABLE_PARAMS_SECTION) {
        Some(Value::Table(t)) => t,
        Some(other) => {
            return Err(RecalibError::InvalidOption {
                key: VARIABLE_PARAMS_SECTION.to_string(),
                value: other.to_string(),
            }
            .into())
        }
        None => Table::new(),
    };

    for ifo in &ifos {
        if calib.contains_key(&format!("{}_calibration_envelope", ifo)) {
            return Err(
                RecalibError::NotImplemented("Reading calibration envelope".to_string()).into(),
            );
        }
        let model = option_str(&calib, CALIBRATION_SECTION, &format!("{}_model", ifo))?;
        match model.as_str() {
            CubicSpline::NAME => {
                let added = expand_cubic_spline(&mut doc, &mut variable_params, &calib, ifo)?;
                info!("{}: {} calibration priors added", ifo, added);
            }
            NoCalibration::NAME => {
                debug!("{}: model '{}' has no parameters to sample", ifo, model);
            }
            _ => return Err(RecalibError::UnknownModel(model).into()),
        }
    }

    doc.insert(
        VARIABLE_PARAMS_SECTION.to_string(),
        Value::Table(variable_params),
    );
    Ok(ExpandedConfig::new(doc))
}

/// Labels taken from the text before the first underscore of each key, sorted.
pub fn infer_interferometers(calib: &Table) -> Vec<String> {
    let labels: BTreeSet<String> = calib
        .keys()
        .filter_map(|key| match key.split_once('_') {
            Some((ifo, _)) if !ifo.is_empty() => Some(ifo.to_string()),
            _ => {
                warn!("ignoring calibration option '{}' without an ifo label", key);
                None
            }
        })
        .collect();
    labels.into_iter().collect()
}

/// Returns the number of prior sections added.
fn expand_cubic_spline(
    doc: &mut Table,
    variable_params: &mut Table,
    calib: &Table,
    ifo: &str,
) -> Result<usize> {
    let n_points_key = format!("{}_n_points", ifo);
    let n_points = option_usize(calib, CALIBRATION_SECTION, &n_points_key)?;
    if n_points == 0 {
        return Err(RecalibError::InvalidOption {
            key: n_points_key,
            value: n_points.to_string(),
        }
        .into());
    }
    if n_points < MIN_KNOTS {
        warn!(
            "{}: {} spline points; the {} model needs at least {}",
            ifo,
            n_points,
            CubicSpline::NAME,
            MIN_KNOTS
        );
    }

    let mut added = 0;
    for param in SPLINE_PARAMETERS {
        let sigma_key = format!("{}_{}_sigma", ifo, param);
        let sigma = if calib.contains_key(&sigma_key) {
            Some(positive_sigma(calib, &sigma_key)?)
        } else {
            None
        };

        for ii in 0..n_points {
            let parameter = format!("{}{}_{}_{}", DEFAULT_PREFIX, param, ifo, ii);
            let section_name = prior_section_name(&parameter);
            variable_params.insert(parameter.clone(), Value::String(String::new()));

            if doc.contains_key(&section_name) {
                warn!("keeping existing prior section [{}]", section_name);
                continue;
            }
            let sigma = sigma.ok_or_else(|| RecalibError::MissingOption {
                section: CALIBRATION_SECTION.to_string(),
                key: sigma_key.clone(),
            })?;
            doc.insert(
                section_name,
                Value::Table(gaussian_section(&parameter, 0.0, sigma * sigma)),
            );
            added += 1;
        }
    }
    Ok(added)
}

fn positive_sigma(calib: &Table, key: &str) -> Result<f64> {
    let sigma = option_f64(calib, CALIBRATION_SECTION, key)?;
    if sigma <= 0.0 {
        return Err(RecalibError::InvalidOption {
            key: key.to_string(),
            value: sigma.to_string(),
        }
        .into());
    }
    Ok(sigma)
}

fn gaussian_section(parameter: &str, mean: f64, variance: f64) -> Table {
    let mut section = Table::new();
    section.insert(
        "name".to_string(),
        Value::String(GaussianPrior::NAME.to_string()),
    );
    section.insert(format!("{}_mean", parameter), Value::Float(mean));
    section.insert(format!("{}_var", parameter), Value::Float(variance));
    section
}
