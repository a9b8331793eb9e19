//! Penalized least-squares fit of a periodic cubic B-spline to a contour.
//!
//! Knots sit at the normalized cumulative chord lengths of the contour
//! points, so with `smoothing = 0` the collocation matrix is square and the
//! curve interpolates every point. A positive smoothing weight adds a cyclic
//! second-difference penalty on the control coefficients (P-spline):
//!
//! ```text
//! (BᵀB + λ DᵀD) c = Bᵀ z,   z ∈ {x, y}
//! ```

use nalgebra::{DMatrix, DVector};

use crate::contour::DiscreteContour;

use super::basis::PeriodicKnots;
use super::types::{InsufficientContourError, SplineCurve};

/// Degree of the fitted spline.
pub const SPLINE_DEGREE: usize = 3;

/// Minimum number of distinct contour points accepted by the fitter.
pub const MIN_CONTOUR_POINTS: usize = SPLINE_DEGREE + 2;

/// Curve fitting parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SplineFitConfig {
    /// Smoothing weight λ ≥ 0; 0 interpolates the contour points.
    pub smoothing: f64,
    /// A closing step longer than this multiple of the median step marks the
    /// point set as not closed.
    pub max_closing_gap_factor: f64,
}

impl Default for SplineFitConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.0,
            max_closing_gap_factor: 3.0,
        }
    }
}

/// Fit a closed periodic spline to `contour`.
///
/// The contour is cleaned of duplicate points and re-oriented to positive
/// signed area (start point preserved) before fitting.
pub fn fit_spline(
    contour: &DiscreteContour,
    config: &SplineFitConfig,
) -> Result<SplineCurve, InsufficientContourError> {
    let mut contour = contour.deduplicated();
    let n = contour.len();
    if n < MIN_CONTOUR_POINTS {
        return Err(InsufficientContourError::TooFewPoints {
            needed: MIN_CONTOUR_POINTS,
            got: n,
        });
    }

    if contour.signed_area() < 0.0 {
        contour = contour.reversed();
    }

    let steps = contour.step_lengths();
    let total: f64 = steps.iter().sum();
    if !total.is_finite() || total <= f64::EPSILON {
        return Err(InsufficientContourError::DegenerateLength);
    }
    let typical_step = median(&steps);
    let gap = steps[n - 1];
    if typical_step <= f64::EPSILON || gap > config.max_closing_gap_factor * typical_step {
        return Err(InsufficientContourError::NotClosed { gap, typical_step });
    }

    let mut knots = Vec::with_capacity(n);
    let mut acc = 0.0;
    for step in &steps[..n - 1] {
        knots.push(acc / total);
        acc += step;
    }
    knots.push(acc / total);

    let b = collocation_matrix(&knots, SPLINE_DEGREE);
    let xs = DVector::from_iterator(n, contour.points().iter().map(|p| p[0]));
    let ys = DVector::from_iterator(n, contour.points().iter().map(|p| p[1]));

    let smoothing = config.smoothing.max(0.0);
    let (cx, cy) = if smoothing == 0.0 {
        let lu = b.lu();
        let cx = lu.solve(&xs).ok_or(InsufficientContourError::SingularSystem)?;
        let cy = lu.solve(&ys).ok_or(InsufficientContourError::SingularSystem)?;
        (cx, cy)
    } else {
        let bt = b.transpose();
        let d = cyclic_second_difference(n);
        let a = &bt * &b + (d.transpose() * &d) * smoothing;
        let chol = a
            .cholesky()
            .ok_or(InsufficientContourError::SingularSystem)?;
        (chol.solve(&(&bt * &xs)), chol.solve(&(&bt * &ys)))
    };

    if cx.iter().chain(cy.iter()).any(|v| !v.is_finite()) {
        return Err(InsufficientContourError::SingularSystem);
    }

    tracing::trace!(
        n_points = n,
        length_px = total,
        smoothing,
        "fitted periodic spline"
    );

    Ok(SplineCurve::from_parts(
        knots,
        cx.iter().copied().collect(),
        cy.iter().copied().collect(),
        SPLINE_DEGREE,
        smoothing,
    ))
}

/// Periodic collocation matrix `B[i, j] = N_j(t_i)`.
fn collocation_matrix(knots: &[f64], degree: usize) -> DMatrix<f64> {
    let n = knots.len();
    let pk = PeriodicKnots::new(knots);
    let mut b = DMatrix::<f64>::zeros(n, n);
    for (i, &t) in knots.iter().enumerate() {
        let s = pk.span(t);
        for (r, v) in pk.basis(s, t, degree).into_iter().enumerate() {
            let j = (s as isize - degree as isize + r as isize).rem_euclid(n as isize) as usize;
            b[(i, j)] += v;
        }
    }
    b
}

fn cyclic_second_difference(n: usize) -> DMatrix<f64> {
    let mut d = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        d[(i, (i + n - 1) % n)] += 1.0;
        d[(i, i)] -= 2.0;
        d[(i, (i + 1) % n)] += 1.0;
    }
    d
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted[sorted.len() / 2]
}
