//! DisplacementProjector: signed edge motion per angular bin.
//!
//! For each corresponding pair `(t₀[i], t[i])` the displacement vector
//! `S(t[i]) − S₀(t₀[i])` is projected onto the unit normal of `S₀` at
//! `t₀[i]`. Curves are fitted with positive signed area, so the normal
//! `(y', −x') / |·|` points outward and protrusion is positive.

use std::cmp::Ordering;

use crate::correspondence::{CorrespondenceError, ParameterSet};
use crate::spline::SplineCurve;

const MIN_TANGENT_NORM: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default)]
pub struct DisplacementProjector;

impl DisplacementProjector {
    pub fn new() -> Self {
        Self
    }

    /// One normal displacement per angular bin.
    pub fn project(
        &self,
        previous: &SplineCurve,
        current: &SplineCurve,
        start: &ParameterSet,
        end: &ParameterSet,
    ) -> Result<Vec<f64>, CorrespondenceError> {
        if start.len() != end.len() {
            return Err(CorrespondenceError::LengthMismatch {
                start: start.len(),
                initial: end.len(),
            });
        }
        let tangents = previous.tangents(start.values());
        start
            .values()
            .iter()
            .zip(end.values())
            .zip(&tangents)
            .enumerate()
            .map(|(bin, ((&t0, &t), d))| {
                let norm = (d[0] * d[0] + d[1] * d[1]).sqrt();
                if norm.partial_cmp(&MIN_TANGENT_NORM) != Some(Ordering::Greater) {
                    return Err(CorrespondenceError::DegenerateTangent { bin });
                }
                let normal = [d[1] / norm, -d[0] / norm];
                let p0 = previous.eval(t0);
                let p1 = current.eval(t);
                Ok((p1[0] - p0[0]) * normal[0] + (p1[1] - p0[1]) * normal[1])
            })
            .collect()
    }
}

/// Outward unit normal of `curve` at `t`, if the tangent is non-degenerate.
pub fn unit_normal(curve: &SplineCurve, t: f64) -> Option<[f64; 2]> {
    let d = curve.derivative(t, 1);
    let norm = (d[0] * d[0] + d[1] * d[1]).sqrt();
    (norm > MIN_TANGENT_NORM).then(|| [d[1] / norm, -d[0] / norm])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::{fit_spline, SplineFitConfig};
    use crate::test_utils::circle_contour;
    use approx::assert_abs_diff_eq;

    fn circle(r: f64) -> SplineCurve {
        fit_spline(&circle_contour([30.0, 30.0], r, 120, 0.0), &SplineFitConfig::default())
            .expect("fit")
    }

    #[test]
    fn uniform_expansion_is_positive() {
        let (s0, s1) = (circle(10.0), circle(10.5));
        let t = ParameterSet::uniform(8, 0.0);
        let d = DisplacementProjector::new()
            .project(&s0, &s1, &t, &t)
            .expect("project");
        for v in d {
            assert_abs_diff_eq!(v, 0.5, epsilon = 1e-3);
        }
    }

    #[test]
    fn clockwise_input_keeps_sign_convention() {
        let s0 = circle(12.0);
        let s1 = fit_spline(
            &circle_contour([30.0, 30.0], 10.0, 120, 0.0).reversed(),
            &SplineFitConfig::default(),
        )
        .expect("fit");
        // Reversal preserved the start point, so bins still line up.
        let t = ParameterSet::uniform(8, 0.0);
        let d = DisplacementProjector::new()
            .project(&s0, &s1, &t, &t)
            .expect("project");
        for v in d {
            assert_abs_diff_eq!(v, -2.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn normal_points_outward() {
        let s = circle(10.0);
        let n = unit_normal(&s, 0.0).expect("normal");
        assert_abs_diff_eq!(n[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(n[1], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn degenerate_tangent_is_reported() {
        let knots: Vec<f64> = (0..6).map(|i| i as f64 / 6.0).collect();
        let flat = SplineCurve::from_parts(knots, vec![5.0; 6], vec![5.0; 6], 3, 0.0);
        let t = ParameterSet::uniform(3, 0.0);
        let err = DisplacementProjector::new()
            .project(&flat, &flat, &t, &t)
            .expect_err("must fail");
        assert_eq!(err, CorrespondenceError::DegenerateTangent { bin: 0 });
    }
}
