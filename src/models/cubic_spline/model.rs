//! Cubic-spline recalibration model.
//!
//! Amplitude and phase corrections are sampled at `n_points` control
//! frequencies spaced evenly in `ln f` between the configured bounds. At
//! evaluation the two sets of control values are splined onto the strain's
//! frequency grid and combined into
//!
//! ```text
//! eta(f) = (1 + dA(f)) * (2 + i dphi(f)) / (2 - i dphi(f))
//! ```
//!
//! i.e. a linear amplitude correction times the first-order Pade form of
//! `exp(i dphi)`.

use anyhow::Result;
use log::debug;
use num_complex::Complex64;
use toml::Table;

use super::spline::{SmoothingSpline, MIN_KNOTS};
use crate::calibration::config::{option_f64, option_usize};
use crate::calibration::types::FrequencySeries;
use crate::error::RecalibError;
use crate::model_params::RecalibParams;
use crate::models::traits::Recalibrate;

/// Construction parameters for [`CubicSpline`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubicSplineConfig {
    /// Lowest control frequency (Hz)
    pub minimum_frequency: f64,
    /// Highest control frequency (Hz)
    pub maximum_frequency: f64,
    /// Number of control points per correction curve (>= 4)
    pub n_points: usize,
    /// Smoothing weight of the spline fit; 0 interpolates the control values
    #[cfg_attr(feature = "serde", serde(default))]
    pub smoothing: f64,
}

impl CubicSplineConfig {
    /// Reads the options of one interferometer, as returned by
    /// [`crate::calibration::config::ifo_options`].
    pub fn from_options(options: &Table, section_name: &str) -> Result<Self> {
        let smoothing = if options.contains_key("smoothing") {
            option_f64(options, section_name, "smoothing")?
        } else {
            0.0
        };
        Ok(Self {
            minimum_frequency: option_f64(options, section_name, "minimum_frequency")?,
            maximum_frequency: option_f64(options, section_name, "maximum_frequency")?,
            n_points: option_usize(options, section_name, "n_points")?,
            smoothing,
        })
    }
}

fn validate_config(config: &CubicSplineConfig) -> Result<()> {
    let fmin = config.minimum_frequency;
    let fmax = config.maximum_frequency;
    if !(fmin > 0.0 && fmin.is_finite()) {
        return Err(invalid(format!(
            "minimum_frequency must be > 0 and finite (minimum_frequency={})",
            fmin
        )));
    }
    if !(fmax > fmin && fmax.is_finite()) {
        return Err(invalid(format!(
            "maximum_frequency must exceed minimum_frequency (minimum_frequency={}, maximum_frequency={})",
            fmin, fmax
        )));
    }
    if config.n_points < MIN_KNOTS {
        return Err(invalid(format!(
            "n_points must be at least {} for a cubic spline (n_points={})",
            MIN_KNOTS, config.n_points
        )));
    }
    if !(config.smoothing >= 0.0 && config.smoothing.is_finite()) {
        return Err(invalid(format!(
            "smoothing must be >= 0 and finite (smoothing={})",
            config.smoothing
        )));
    }
    Ok(())
}

fn invalid(msg: String) -> anyhow::Error {
    RecalibError::InvalidModelConfig(msg).into()
}

/// `n` frequencies evenly spaced in `ln f` from `fmin` to `fmax` inclusive.
pub fn log_spaced_points(fmin: f64, fmax: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![fmin; n];
    }
    let (lo, hi) = (fmin.ln(), fmax.ln());
    let step = (hi - lo) / (n - 1) as f64;
    (0..n)
        .map(|i| {
            // Pin the end points exactly.
            if i == 0 {
                fmin
            } else if i == n - 1 {
                fmax
            } else {
                (lo + step * i as f64).exp()
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct CubicSpline {
    config: CubicSplineConfig,
    spline_points: Vec<f64>,
    ifo_name: Option<String>,
    params: RecalibParams,
    amplitude_keys: Vec<String>,
    phase_keys: Vec<String>,
}

impl CubicSpline {
    pub const NAME: &'static str = "cubic_spline";

    pub fn new(minimum_frequency: f64, maximum_frequency: f64, n_points: usize) -> Result<Self> {
        Self::from_config(CubicSplineConfig {
            minimum_frequency,
            maximum_frequency,
            n_points,
            smoothing: 0.0,
        })
    }

    pub fn from_config(config: CubicSplineConfig) -> Result<Self> {
        validate_config(&config)?;
        let spline_points = log_spaced_points(
            config.minimum_frequency,
            config.maximum_frequency,
            config.n_points,
        );
        let mut model = Self {
            config,
            spline_points,
            ifo_name: None,
            params: RecalibParams::default(),
            amplitude_keys: Vec::new(),
            phase_keys: Vec::new(),
        };
        model.rebuild_keys();
        Ok(model)
    }

    /// Qualifies parameter names with an interferometer label:
    /// `amplitude_{ifo}_{i}` instead of `amplitude_{i}`.
    pub fn with_ifo_name(mut self, ifo: impl Into<String>) -> Self {
        self.ifo_name = Some(ifo.into());
        self.rebuild_keys();
        self
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Result<Self> {
        let config = CubicSplineConfig {
            smoothing,
            ..self.config.clone()
        };
        validate_config(&config)?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &CubicSplineConfig {
        &self.config
    }

    pub fn n_points(&self) -> usize {
        self.config.n_points
    }

    pub fn spline_points(&self) -> &[f64] {
        &self.spline_points
    }

    fn rebuild_keys(&mut self) {
        let key = |kind: &str, i: usize| match &self.ifo_name {
            Some(ifo) => format!("{}_{}_{}", kind, ifo, i),
            None => format!("{}_{}", kind, i),
        };
        let amplitude_keys = (0..self.config.n_points).map(|i| key("amplitude", i)).collect();
        let phase_keys = (0..self.config.n_points).map(|i| key("phase", i)).collect();
        self.amplitude_keys = amplitude_keys;
        self.phase_keys = phase_keys;
    }

    /// Complex correction factor at each of `frequencies`.
    pub fn correction(&self, frequencies: &[f64]) -> Result<Vec<Complex64>> {
        if let Some(bad) = frequencies.iter().find(|f| !f.is_finite()) {
            return Err(RecalibError::InvalidFrequencyGrid(format!(
                "non-finite frequency {}",
                bad
            ))
            .into());
        }
        let amplitudes = self.params.collect(&self.amplitude_keys)?;
        let amplitude_spline =
            SmoothingSpline::fit(&self.spline_points, &amplitudes, self.config.smoothing)?;
        let delta_amplitude = amplitude_spline.evaluate_all(frequencies);

        let phases = self.params.collect(&self.phase_keys)?;
        let phase_spline =
            SmoothingSpline::fit(&self.spline_points, &phases, self.config.smoothing)?;
        let delta_phase = phase_spline.evaluate_all(frequencies);

        Ok(delta_amplitude
            .iter()
            .zip(&delta_phase)
            .map(|(&da, &dphi)| {
                Complex64::new(1.0 + da, 0.0) * Complex64::new(2.0, dphi)
                    / Complex64::new(2.0, -dphi)
            })
            .collect())
    }
}

impl Recalibrate for CubicSpline {
    fn model_name(&self) -> &str {
        Self::NAME
    }

    fn ifo_name(&self) -> Option<&str> {
        self.ifo_name.as_deref()
    }

    fn params(&self) -> &RecalibParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut RecalibParams {
        &mut self.params
    }

    fn required_parameters(&self) -> Vec<String> {
        self.amplitude_keys
            .iter()
            .chain(&self.phase_keys)
            .cloned()
            .collect()
    }

    fn apply_calibration(&self, strain: &FrequencySeries) -> Result<FrequencySeries> {
        debug!(
            "applying {} correction ({} control points) to {} bins",
            Self::NAME,
            self.config.n_points,
            strain.len()
        );
        let correction = self.correction(strain.sample_frequencies())?;
        strain.scaled_by(&correction)
    }
}
