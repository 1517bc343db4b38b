//! SVG rendering of a model's correction curves, for checking a parameter draw
//! by eye.

use std::path::Path;

use anyhow::{anyhow, Result};
use log::info;
use num_complex::Complex64;
use plotters::prelude::*;

use crate::calibration::types::FrequencySeries;
use crate::models::traits::Recalibrate;

/// Plots `|eta(f)|` (top) and `arg eta(f)` in degrees (bottom) for the model's
/// currently bound parameters over `frequencies`.
pub fn plot_correction(model: &dyn Recalibrate, frequencies: &[f64], path: &Path) -> Result<()> {
    if frequencies.len() < 2 {
        return Err(anyhow!("Need at least 2 frequencies to plot a correction"));
    }
    // A unit strain comes back as the correction factor itself.
    let unit = FrequencySeries::new(
        vec![Complex64::new(1.0, 0.0); frequencies.len()],
        frequencies.to_vec(),
    )?;
    let correction = model.apply_calibration(&unit)?;

    let amplitude: Vec<(f64, f64)> = frequencies
        .iter()
        .zip(correction.data())
        .map(|(&f, c)| (f, c.norm()))
        .collect();
    let phase: Vec<(f64, f64)> = frequencies
        .iter()
        .zip(correction.data())
        .map(|(&f, c)| (f, c.arg().to_degrees()))
        .collect();

    let f_min = frequencies[0];
    let f_max = frequencies[frequencies.len() - 1];
    let label = match model.ifo_name() {
        Some(ifo) => format!("{} {}", ifo, model.model_name()),
        None => model.model_name().to_string(),
    };

    let root = SVGBackend::new(path, (1280, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));

    for (area, (series, y_desc)) in panels
        .iter()
        .zip([(&amplitude, "|eta|"), (&phase, "arg eta (deg)")])
    {
        let (y_min, y_max) = padded_range(series);
        let mut chart = ChartBuilder::on(area)
            .margin(20)
            .caption(format!("Calibration correction | {}", label), ("sans-serif", 24))
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(f_min..f_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Frequency (Hz)")
            .y_desc(y_desc)
            .draw()?;

        chart.draw_series(vec![PathElement::new(series.clone(), RED)])?;
    }

    root.present()?;
    info!("correction plot saved to {}", path.display());
    Ok(())
}

fn padded_range(series: &[(f64, f64)]) -> (f64, f64) {
    let lo = series.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let hi = series.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((hi - lo) * 0.1).max(1e-3);
    (lo - pad, hi + pad)
}
