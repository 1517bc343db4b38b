use anyhow::Result;
use num_complex::Complex64;

use crate::error::RecalibError;

/// Frequency-domain strain: one complex amplitude per sample frequency.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrequencySeries {
    data: Vec<Complex64>,
    frequencies: Vec<f64>,
}

impl FrequencySeries {
    /// Builds a series on an explicit frequency grid.
    ///
    /// The grid must have one entry per amplitude, be finite, and be strictly
    /// ascending; otherwise the spline evaluation would silently misalign.
    pub fn new(data: Vec<Complex64>, frequencies: Vec<f64>) -> Result<Self> {
        validate_grid(&frequencies, data.len())?;
        Ok(Self { data, frequencies })
    }

    /// Uniform grid `0, delta_f, 2 delta_f, ...` with one bin per amplitude.
    pub fn from_delta_f(data: Vec<Complex64>, delta_f: f64) -> Result<Self> {
        if !(delta_f > 0.0 && delta_f.is_finite()) {
            return Err(RecalibError::InvalidFrequencyGrid(format!(
                "delta_f must be > 0 and finite (delta_f={})",
                delta_f
            ))
            .into());
        }
        let frequencies = (0..data.len()).map(|i| i as f64 * delta_f).collect();
        Self::new(data, frequencies)
    }

    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    pub fn sample_frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Multiplies every bin by the matching correction factor, keeping the grid.
    pub fn scaled_by(&self, correction: &[Complex64]) -> Result<Self> {
        if correction.len() != self.data.len() {
            return Err(RecalibError::InvalidFrequencyGrid(format!(
                "correction has {} bins, strain has {}",
                correction.len(),
                self.data.len()
            ))
            .into());
        }
        let data = self
            .data
            .iter()
            .zip(correction)
            .map(|(h, c)| h * c)
            .collect();
        Ok(Self {
            data,
            frequencies: self.frequencies.clone(),
        })
    }
}

fn validate_grid(frequencies: &[f64], n_bins: usize) -> Result<()> {
    if frequencies.len() != n_bins {
        return Err(RecalibError::InvalidFrequencyGrid(format!(
            "{} sample frequencies for {} amplitudes",
            frequencies.len(),
            n_bins
        ))
        .into());
    }
    if let Some(f) = frequencies.iter().find(|f| !f.is_finite()) {
        return Err(
            RecalibError::InvalidFrequencyGrid(format!("non-finite frequency {}", f)).into(),
        );
    }
    if let Some(i) = frequencies.windows(2).position(|w| w[1] <= w[0]) {
        return Err(RecalibError::InvalidFrequencyGrid(format!(
            "frequencies not strictly ascending at index {} ({} -> {})",
            i + 1,
            frequencies[i],
            frequencies[i + 1]
        ))
        .into());
    }
    Ok(())
}
