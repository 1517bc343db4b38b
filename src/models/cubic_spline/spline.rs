//! Natural cubic smoothing spline.
//!
//! For knots `t_1 < ... < t_n` with data `y`, the fitted curve `g` minimises
//!
//! ```text
//! sum_i (y_i - g(t_i))^2 + lambda * integral g''(t)^2 dt
//! ```
//!
//! In Reinsch form the knot values `g` and interior second derivatives `gamma`
//! solve `(R + lambda Q^T Q) gamma = Q^T y` and `g = y - lambda Q gamma`, where
//! `Q` (n x n-2) and `R` (n-2 x n-2) are the banded matrices built from the knot
//! spacings. `lambda = 0` reduces to the natural interpolating spline. Outside
//! the knots the curve continues linearly along the end slopes.

use anyhow::Result;
use nalgebra::{DMatrix, DVector};

use crate::error::RecalibError;

/// Knots needed for a well-posed cubic fit (degree + 1).
pub const MIN_KNOTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingSpline {
    knots: Vec<f64>,
    /// Fitted values at the knots.
    values: Vec<f64>,
    /// Second derivatives at the knots; zero at both ends.
    second_derivs: Vec<f64>,
}

impl SmoothingSpline {
    /// Fits the spline through `(knots, data)` with smoothing weight `lambda`.
    pub fn fit(knots: &[f64], data: &[f64], lambda: f64) -> Result<Self> {
        let n = knots.len();
        if n != data.len() {
            return Err(fit_error(format!(
                "{} knots but {} data values",
                n,
                data.len()
            )));
        }
        if n < MIN_KNOTS {
            return Err(fit_error(format!(
                "a cubic spline needs at least {} knots, got {}",
                MIN_KNOTS, n
            )));
        }
        if !(lambda >= 0.0 && lambda.is_finite()) {
            return Err(fit_error(format!(
                "smoothing weight must be >= 0 and finite (lambda={})",
                lambda
            )));
        }
        if knots.iter().chain(data).any(|v| !v.is_finite()) {
            return Err(fit_error("knots and data must be finite".to_string()));
        }
        if knots.windows(2).any(|w| w[1] <= w[0]) {
            return Err(fit_error("knots must be strictly increasing".to_string()));
        }

        let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
        let m = n - 2;

        let mut q = DMatrix::<f64>::zeros(n, m);
        let mut r = DMatrix::<f64>::zeros(m, m);
        for j in 0..m {
            // Column j belongs to interior knot j + 1.
            q[(j, j)] = 1.0 / h[j];
            q[(j + 1, j)] = -1.0 / h[j] - 1.0 / h[j + 1];
            q[(j + 2, j)] = 1.0 / h[j + 1];

            r[(j, j)] = (h[j] + h[j + 1]) / 3.0;
            if j + 1 < m {
                r[(j, j + 1)] = h[j + 1] / 6.0;
                r[(j + 1, j)] = h[j + 1] / 6.0;
            }
        }

        let y = DVector::from_column_slice(data);
        let qt = q.transpose();
        let system = &r + (&qt * &q) * lambda;
        let rhs = &qt * &y;
        let gamma = system.lu().solve(&rhs).ok_or_else(|| {
            fit_error("singular spline system (degenerate knot spacing)".to_string())
        })?;
        let fitted = &y - (&q * &gamma) * lambda;

        let mut second_derivs = vec![0.0; n];
        second_derivs[1..n - 1].copy_from_slice(gamma.as_slice());

        Ok(Self {
            knots: knots.to_vec(),
            values: fitted.as_slice().to_vec(),
            second_derivs,
        })
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Fitted values at the knots (equal to the data when `lambda == 0`).
    pub fn knot_values(&self) -> &[f64] {
        &self.values
    }

    /// Evaluates the spline at `x`. NaN in gives NaN out.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let t = &self.knots;
        let g = &self.values;
        let gamma = &self.second_derivs;
        let n = t.len();

        if x <= t[0] {
            let h = t[1] - t[0];
            let slope = (g[1] - g[0]) / h - h * gamma[1] / 6.0;
            return g[0] + (x - t[0]) * slope;
        }
        if x >= t[n - 1] {
            let h = t[n - 1] - t[n - 2];
            let slope = (g[n - 1] - g[n - 2]) / h + h * gamma[n - 2] / 6.0;
            return g[n - 1] + (x - t[n - 1]) * slope;
        }

        // Interval i with t[i] <= x < t[i + 1].
        let i = t.partition_point(|&knot| knot <= x) - 1;
        let h = t[i + 1] - t[i];
        let a = x - t[i];
        let b = t[i + 1] - x;
        (a * g[i + 1] + b * g[i]) / h
            - a * b / 6.0 * ((1.0 + a / h) * gamma[i + 1] + (1.0 + b / h) * gamma[i])
    }

    /// Evaluates the spline at every point of `xs`.
    pub fn evaluate_all(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }
}

fn fit_error(msg: String) -> anyhow::Error {
    RecalibError::SplineFit(msg).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOTS: [f64; 5] = [10.0, 30.0, 100.0, 300.0, 1000.0];

    #[test]
    fn test_interpolates_knots_without_smoothing() {
        let data = [0.1, -0.05, 0.2, 0.0, 0.3];
        let spline = SmoothingSpline::fit(&KNOTS, &data, 0.0).unwrap();
        for (x, y) in KNOTS.iter().zip(data.iter()) {
            assert!((spline.evaluate(*x) - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_linear_data_reproduced_everywhere() {
        let data: Vec<f64> = KNOTS.iter().map(|x| 0.5 + 0.002 * x).collect();
        let spline = SmoothingSpline::fit(&KNOTS, &data, 0.0).unwrap();
        for x in [0.0, 5.0, 20.0, 250.0, 999.0, 2048.0] {
            let expected = 0.5 + 0.002 * x;
            assert!(
                (spline.evaluate(x) - expected).abs() < 1e-10,
                "x={} got {} expected {}",
                x,
                spline.evaluate(x),
                expected
            );
        }
    }

    #[test]
    fn test_continuous_at_interior_knots() {
        let data = [0.0, 1.0, -1.0, 0.5, 0.2];
        let spline = SmoothingSpline::fit(&KNOTS, &data, 0.0).unwrap();
        for &x in &KNOTS[1..4] {
            let left = spline.evaluate(x - 1e-7);
            let right = spline.evaluate(x + 1e-7);
            assert!((left - right).abs() < 1e-5);
        }
    }

    #[test]
    fn test_smoothing_flattens_towards_linear_fit() {
        let data = [0.0, 1.0, 0.0, 1.0, 0.0];
        let knots = [0.0, 1.0, 2.0, 3.0, 4.0];
        let rough = SmoothingSpline::fit(&knots, &data, 0.0).unwrap();
        let smooth = SmoothingSpline::fit(&knots, &data, 1e6).unwrap();
        let spread = |s: &SmoothingSpline| {
            let v = s.knot_values();
            v.iter().cloned().fold(f64::MIN, f64::max) - v.iter().cloned().fold(f64::MAX, f64::min)
        };
        assert!(spread(&smooth) < 0.05 * spread(&rough));
        // Heavy smoothing tends to the least-squares line, which here is flat at 0.4.
        assert!((smooth.evaluate(2.0) - 0.4).abs() < 1e-3);
    }

    #[test]
    fn test_too_few_knots_fails() {
        let err = SmoothingSpline::fit(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0], 0.0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecalibError>(),
            Some(RecalibError::SplineFit(_))
        ));
    }

    #[test]
    fn test_unsorted_knots_fail() {
        assert!(SmoothingSpline::fit(&[1.0, 3.0, 2.0, 4.0], &[0.0; 4], 0.0).is_err());
    }

    #[test]
    fn test_nan_input_evaluates_to_nan() {
        let spline = SmoothingSpline::fit(&KNOTS, &[0.1, -0.05, 0.2, 0.0, 0.3], 0.0).unwrap();
        assert!(spline.evaluate(f64::NAN).is_nan());
    }
}
