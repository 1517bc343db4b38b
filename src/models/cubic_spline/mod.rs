pub mod model;
pub mod spline;

pub use model::{log_spaced_points, CubicSpline, CubicSplineConfig};
pub use spline::SmoothingSpline;
