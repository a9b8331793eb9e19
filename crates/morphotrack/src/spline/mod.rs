//! CurveFitter: smoothed periodic parametric curves fitted to discrete contours.

mod basis;
pub(crate) mod fit;
mod types;

pub use fit::{fit_spline, SplineFitConfig, MIN_CONTOUR_POINTS, SPLINE_DEGREE};
pub use types::{InsufficientContourError, SplineCurve};

pub(crate) use basis::wrap_unit;
