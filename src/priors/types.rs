use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::{Continuous, Normal};
use toml::{Table, Value};

use crate::calibration::config::{option_f64, option_str};

/// Section holding the human-authored calibration uncertainty.
pub const CALIBRATION_SECTION: &str = "calibration";
/// Section whose keys are the parameters the sampler varies.
pub const VARIABLE_PARAMS_SECTION: &str = "variable_params";
/// Prior sections are named `prior-{parameter}`.
pub const PRIOR_SECTION_PREFIX: &str = "prior-";

pub fn prior_section_name(parameter: &str) -> String {
    format!("{}{}", PRIOR_SECTION_PREFIX, parameter)
}

/// Normal prior on one sampled parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaussianPrior {
    pub parameter: String,
    pub mean: f64,
    pub variance: f64,
}

impl GaussianPrior {
    pub const NAME: &'static str = "gaussian";

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    pub fn distribution(&self) -> Result<Normal> {
        Normal::new(self.mean, self.std_dev())
            .with_context(|| format!("Invalid gaussian prior on {}", self.parameter))
    }

    pub fn ln_pdf(&self, x: f64) -> Result<f64> {
        Ok(self.distribution()?.ln_pdf(x))
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        Ok(self.distribution()?.sample(rng))
    }
}

/// Draws one value per prior, keyed by parameter name.
///
/// The result has the shape of a sampler's parameter vector and can be handed
/// straight to [`crate::Recalibrate::map_to_adjust`].
pub fn draw_calibration_parameters<R: Rng + ?Sized>(
    priors: &[GaussianPrior],
    rng: &mut R,
) -> Result<HashMap<String, f64>> {
    priors
        .iter()
        .map(|prior| -> Result<(String, f64)> {
            Ok((prior.parameter.clone(), prior.sample(rng)?))
        })
        .collect()
}

/// A config document after calibration expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedConfig {
    doc: Table,
}

impl ExpandedConfig {
    pub(crate) fn new(doc: Table) -> Self {
        Self { doc }
    }

    pub fn table(&self) -> &Table {
        &self.doc
    }

    pub fn into_table(self) -> Table {
        self.doc
    }

    pub fn section(&self, name: &str) -> Option<&Table> {
        self.doc.get(name).and_then(Value::as_table)
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.doc
            .iter()
            .filter(|(_, v)| v.is_table())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Names registered in `[variable_params]`.
    pub fn variable_params(&self) -> Vec<&str> {
        self.section(VARIABLE_PARAMS_SECTION)
            .map(|s| s.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Gaussian priors of all variable parameters that have one.
    ///
    /// Variable parameters with another prior family, or without a prior
    /// section, are skipped.
    pub fn gaussian_priors(&self) -> Result<Vec<GaussianPrior>> {
        let mut priors = Vec::new();
        for parameter in self.variable_params() {
            let section_name = prior_section_name(parameter);
            let Some(section) = self.section(&section_name) else {
                continue;
            };
            if option_str(section, &section_name, "name")? != GaussianPrior::NAME {
                continue;
            }
            priors.push(GaussianPrior {
                parameter: parameter.to_string(),
                mean: option_f64(section, &section_name, &format!("{}_mean", parameter))?,
                variance: option_f64(section, &section_name, &format!("{}_var", parameter))?,
            });
        }
        Ok(priors)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(&self.doc).context("Failed to serialize expanded config")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.to_toml_string()?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }
}
