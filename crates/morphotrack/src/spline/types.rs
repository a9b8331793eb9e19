//! Periodic spline curve type, its measures and the fitting error.

use serde::{Deserialize, Serialize};

use super::basis::{derivative_coeffs, evaluate, wrap_unit, PeriodicKnots};

// ── Error type ─────────────────────────────────────────────────────────────

/// Malformed or too-small contour handed to the curve fitter.
#[derive(Debug, Clone, PartialEq)]
pub enum InsufficientContourError {
    /// Too few distinct points for the spline degree.
    TooFewPoints {
        /// Required minimum number of points.
        needed: usize,
        /// Provided number of distinct points.
        got: usize,
    },
    /// The closing step (last point back to the first) is far longer than
    /// the typical step, so the point set is not a closed loop.
    NotClosed {
        /// Length of the closing step in pixels.
        gap: f64,
        /// Median step length in pixels.
        typical_step: f64,
    },
    /// All points coincide or the total length is not finite.
    DegenerateLength,
    /// The fitting system could not be factorized.
    SingularSystem,
}

impl std::fmt::Display for InsufficientContourError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few contour points: need {}, got {}", needed, got)
            }
            Self::NotClosed { gap, typical_step } => write!(
                f,
                "contour is not closed: closing gap {:.2}px vs typical step {:.2}px",
                gap, typical_step
            ),
            Self::DegenerateLength => write!(f, "contour has zero or non-finite length"),
            Self::SingularSystem => write!(f, "spline fitting system is singular"),
        }
    }
}

impl std::error::Error for InsufficientContourError {}

// ── Curve ──────────────────────────────────────────────────────────────────

/// Closed parametric B-spline curve over the periodic domain `[0, 1)`.
///
/// Evaluation at `t` and `t + 1` yields the same point. Knots are the
/// normalized arc positions of the fitted contour points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineCurve {
    knots: Vec<f64>,
    coeffs_x: Vec<f64>,
    coeffs_y: Vec<f64>,
    degree: usize,
    smoothing: f64,
}

/// Gauss–Legendre nodes/weights on `[-1, 1]`, 5 points.
const GL5: [(f64, f64); 5] = [
    (0.0, 0.568_888_888_888_888_9),
    (-0.538_469_310_105_683, 0.478_628_670_499_366_5),
    (0.538_469_310_105_683, 0.478_628_670_499_366_5),
    (-0.906_179_845_938_664, 0.236_926_885_056_189_1),
    (0.906_179_845_938_664, 0.236_926_885_056_189_1),
];

impl SplineCurve {
    pub(crate) fn from_parts(
        knots: Vec<f64>,
        coeffs_x: Vec<f64>,
        coeffs_y: Vec<f64>,
        degree: usize,
        smoothing: f64,
    ) -> Self {
        debug_assert_eq!(knots.len(), coeffs_x.len());
        debug_assert_eq!(knots.len(), coeffs_y.len());
        Self {
            knots,
            coeffs_x,
            coeffs_y,
            degree,
            smoothing,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Smoothing weight λ the curve was fitted with.
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Control coefficients `(x, y)`.
    pub fn coefficients(&self) -> (&[f64], &[f64]) {
        (&self.coeffs_x, &self.coeffs_y)
    }

    fn periodic_knots(&self) -> PeriodicKnots<'_> {
        PeriodicKnots::new(&self.knots)
    }

    /// Point on the curve at parameter `t` (any real; reduced mod 1).
    pub fn eval(&self, t: f64) -> [f64; 2] {
        let t = wrap_unit(t);
        let pk = self.periodic_knots();
        [
            evaluate(pk, &self.coeffs_x, self.degree, t),
            evaluate(pk, &self.coeffs_y, self.degree, t),
        ]
    }

    /// `order`-th derivative with respect to `t`. Orders above the degree
    /// are identically zero.
    pub fn derivative(&self, t: f64, order: usize) -> [f64; 2] {
        if order == 0 {
            return self.eval(t);
        }
        if order > self.degree {
            return [0.0, 0.0];
        }
        let t = wrap_unit(t);
        let pk = self.periodic_knots();
        let q = self.degree - order;
        let dx = derivative_coeffs(pk, &self.coeffs_x, self.degree, order);
        let dy = derivative_coeffs(pk, &self.coeffs_y, self.degree, order);
        [evaluate(pk, &dx, q, t), evaluate(pk, &dy, q, t)]
    }

    /// Evaluate a batch of parameters.
    pub fn eval_many(&self, ts: &[f64]) -> Vec<[f64; 2]> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }

    /// First derivatives for a batch of parameters (derivative coefficients
    /// are computed once).
    pub fn tangents(&self, ts: &[f64]) -> Vec<[f64; 2]> {
        let pk = self.periodic_knots();
        let q = self.degree - 1;
        let dx = derivative_coeffs(pk, &self.coeffs_x, self.degree, 1);
        let dy = derivative_coeffs(pk, &self.coeffs_y, self.degree, 1);
        ts.iter()
            .map(|&t| {
                let t = wrap_unit(t);
                [evaluate(pk, &dx, q, t), evaluate(pk, &dy, q, t)]
            })
            .collect()
    }

    /// `n` points at `origin + m / n`, `m = 0..n`.
    pub fn sample_uniform(&self, n: usize, origin: f64) -> Vec<[f64; 2]> {
        (0..n)
            .map(|m| self.eval(origin + m as f64 / n as f64))
            .collect()
    }

    /// Quadrature over every knot span of `integrand(x, y, x', y')`.
    fn integrate(&self, integrand: impl Fn([f64; 2], [f64; 2]) -> f64) -> f64 {
        let pk = self.periodic_knots();
        let q = self.degree - 1;
        let dx = derivative_coeffs(pk, &self.coeffs_x, self.degree, 1);
        let dy = derivative_coeffs(pk, &self.coeffs_y, self.degree, 1);
        let n = self.knots.len() as isize;
        let mut total = 0.0;
        for s in 0..n {
            let a = pk.at(s);
            let b = pk.at(s + 1);
            let half = 0.5 * (b - a);
            let mid = 0.5 * (a + b);
            for &(x, w) in &GL5 {
                let t = wrap_unit(mid + half * x);
                let p = [
                    evaluate(pk, &self.coeffs_x, self.degree, t),
                    evaluate(pk, &self.coeffs_y, self.degree, t),
                ];
                let d = [evaluate(pk, &dx, q, t), evaluate(pk, &dy, q, t)];
                total += w * half * integrand(p, d);
            }
        }
        total
    }

    /// Arc length of the closed curve.
    pub fn length(&self) -> f64 {
        self.integrate(|_, d| (d[0] * d[0] + d[1] * d[1]).sqrt())
    }

    /// Signed enclosed area (Green's theorem); positive for counter-clockwise
    /// traversal in (x, y).
    pub fn signed_area(&self) -> f64 {
        0.5 * self.integrate(|p, d| p[0] * d[1] - p[1] * d[0])
    }

    /// Enclosed area.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::fit::{fit_spline, SplineFitConfig};
    use crate::test_utils::circle_contour;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn circle_curve(r: f64) -> SplineCurve {
        let c = circle_contour([40.0, 40.0], r, 128, 0.0);
        fit_spline(&c, &SplineFitConfig::default()).expect("fit")
    }

    #[test]
    fn evaluation_is_periodic() {
        let s = circle_curve(10.0);
        for &t in &[0.0, 0.13, 0.5, 0.87] {
            let a = s.eval(t);
            let b = s.eval(t + 1.0);
            let c = s.eval(t - 3.0);
            assert_relative_eq!(a[0], b[0], epsilon = 1e-9);
            assert_relative_eq!(a[1], b[1], epsilon = 1e-9);
            assert_relative_eq!(a[0], c[0], epsilon = 1e-9);
            assert_relative_eq!(a[1], c[1], epsilon = 1e-9);
        }
    }

    #[test]
    fn circle_length_and_area() {
        let s = circle_curve(10.0);
        assert_relative_eq!(s.length(), 2.0 * PI * 10.0, max_relative = 1e-3);
        assert_relative_eq!(s.area(), PI * 100.0, max_relative = 1e-3);
        assert!(s.signed_area() > 0.0);
    }

    #[test]
    fn tangent_matches_finite_difference() {
        let s = circle_curve(12.0);
        let h = 1e-6;
        for &t in &[0.05, 0.4, 0.93] {
            let d = s.derivative(t, 1);
            let a = s.eval(t - h);
            let b = s.eval(t + h);
            assert_relative_eq!(d[0], (b[0] - a[0]) / (2.0 * h), max_relative = 1e-4);
            assert_relative_eq!(d[1], (b[1] - a[1]) / (2.0 * h), max_relative = 1e-4);
            let batch = s.tangents(&[t]);
            assert_relative_eq!(batch[0][0], d[0], epsilon = 1e-12);
        }
    }

    #[test]
    fn derivative_beyond_degree_is_zero() {
        let s = circle_curve(5.0);
        assert_eq!(s.derivative(0.3, 4), [0.0, 0.0]);
    }

    #[test]
    fn serde_roundtrip_preserves_curve() {
        let s = circle_curve(8.0);
        let json = serde_json::to_string(&s).expect("serialize");
        let back: SplineCurve = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(s, back);
    }
}
