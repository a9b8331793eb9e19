//! Least-squares functional for curve-to-curve correspondence with periodic
//! boundary conditions.
//!
//! Unknowns are the end parameters `o` on the current curve. The solver works
//! on the cyclic-difference variable `r` (`r[0] = o[0]`,
//! `r[i] = o[i] − o[i−1]`, `r[n] = o[0] − o[n−1]`) so that ordering becomes a
//! set of sign conditions on the increments.

use tiny_solver::factors::na as ts_na;
use tiny_solver::factors::na::{DMatrix, DVector};

use crate::spline::SplineCurve;

use super::types::RegularizationRatio;

/// Residual norm below which an iterate counts as an exact fit.
const RESIDUAL_FLOOR: f64 = 1e-9;

/// Forward change of variable: `n` raw parameters → `n + 1` increments.
pub fn transform(o: &[f64]) -> Vec<f64> {
    let n = o.len();
    if n == 0 {
        return vec![0.0];
    }
    let mut r = vec![0.0; n + 1];
    r[0] = o[0];
    for i in 1..n {
        r[i] = o[i] - o[i - 1];
    }
    r[n] = o[0] - o[n - 1];
    r
}

/// Inverse change of variable (cumulative sum of the first `n` slots).
pub fn inverse_transform(r: &[f64]) -> Vec<f64> {
    let n = r.len().saturating_sub(1);
    cumulative(&r[..n])
}

fn cumulative(increments: &[f64]) -> Vec<f64> {
    let mut o = Vec::with_capacity(increments.len());
    let mut acc = 0.0;
    for (i, &d) in increments.iter().enumerate() {
        acc = if i == 0 { d } else { acc + d };
        o.push(acc);
    }
    o
}

/// Geometric-plus-regularization residuals between `reference` evaluated at
/// fixed start parameters and `target` evaluated at the unknowns.
///
/// As a [`tiny_solver`] factor the single parameter block holds the free
/// increments `r[0..n]`.
#[derive(Debug, Clone)]
pub struct Functional {
    target: SplineCurve,
    start: Vec<f64>,
    start_points: Vec<[f64; 2]>,
    sqrt_weight: f64,
    ratio: RegularizationRatio,
}

impl Functional {
    pub fn new(
        reference: &SplineCurve,
        target: &SplineCurve,
        start: &[f64],
        weight: f64,
        ratio: RegularizationRatio,
    ) -> Self {
        Self {
            target: target.clone(),
            start: start.to_vec(),
            start_points: reference.eval_many(start),
            sqrt_weight: weight.max(0.0).sqrt(),
            ratio,
        }
    }

    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    /// Start spacing for regularization row `i` (`i = 0` is the wrap segment).
    fn start_spacing(&self, i: usize) -> f64 {
        let n = self.start.len();
        if i == 0 {
            1.0 + self.start[0] - self.start[n - 1]
        } else {
            self.start[i] - self.start[i - 1]
        }
    }

    /// Row index of the regularization residual for segment `i`.
    fn reg_row(n: usize, i: usize) -> usize {
        if i == 0 {
            3 * n - 1
        } else {
            2 * n - 1 + i
        }
    }

    /// Residuals over any real field. Spline values are lifted to first
    /// order around the real part of each parameter, which is exact for
    /// plain `f64` and carries the tangent through dual numbers.
    fn residuals_generic<T: ts_na::RealField>(&self, o: &[T]) -> ts_na::DVector<T> {
        let n = o.len();
        let lift = |v: f64| ts_na::convert::<f64, T>(v);
        let mut f = ts_na::DVector::<T>::zeros(3 * n);
        for (i, (oi, sp)) in o.iter().zip(&self.start_points).enumerate() {
            let v: f64 = ts_na::convert_ref_unchecked::<T, f64>(oi);
            let dt = oi.clone() - lift(v);
            let p = self.target.eval(v);
            let d = self.target.derivative(v, 1);
            f[i] = lift(p[0] - sp[0]) + dt.clone() * lift(d[0]);
            f[n + i] = lift(p[1] - sp[1]) + dt * lift(d[1]);
        }
        let w = lift(self.sqrt_weight);
        for i in 0..n {
            let dp = lift(self.start_spacing(i));
            let d_o = if i == 0 {
                lift(1.0) + o[0].clone() - o[n - 1].clone()
            } else {
                o[i].clone() - o[i - 1].clone()
            };
            f[Self::reg_row(n, i)] = w.clone()
                * match self.ratio {
                    RegularizationRatio::EndOverStart => d_o / dp,
                    RegularizationRatio::StartOverEnd => dp / d_o,
                };
        }
        f
    }

    /// Residual vector of length `3n` at raw parameters `o`.
    pub fn residuals(&self, o: &[f64]) -> DVector<f64> {
        self.residuals_generic(o)
    }

    /// Jacobian of [`Self::residuals`] with respect to `o` (`3n × n`).
    pub fn jacobian(&self, o: &[f64]) -> DMatrix<f64> {
        let n = o.len();
        let mut j = DMatrix::<f64>::zeros(3 * n, n);
        for (i, d) in self.target.tangents(o).into_iter().enumerate() {
            j[(i, i)] = d[0];
            j[(n + i, i)] = d[1];
        }
        for i in 0..n {
            let dp = self.start_spacing(i);
            let d_o = if i == 0 { 1.0 + o[0] - o[n - 1] } else { o[i] - o[i - 1] };
            let slope = self.sqrt_weight
                * match self.ratio {
                    RegularizationRatio::EndOverStart => 1.0 / dp,
                    RegularizationRatio::StartOverEnd => -dp / (d_o * d_o),
                };
            let row = Self::reg_row(n, i);
            let (hi, lo) = if i == 0 { (0, n - 1) } else { (i, i - 1) };
            j[(row, hi)] += slope;
            j[(row, lo)] -= slope;
        }
        j
    }

    /// Residuals as a function of the transformed variable `r` (length `n + 1`).
    pub fn residuals_transformed(&self, r: &[f64]) -> DVector<f64> {
        self.residuals(&inverse_transform(r))
    }

    /// Residuals at the free increments `x = r[0..n]`.
    pub(crate) fn increment_residuals(&self, x: &[f64]) -> DVector<f64> {
        self.residuals(&cumulative(x))
    }

    /// Sum of squared residuals at the free increments.
    pub(crate) fn cost(&self, x: &[f64]) -> f64 {
        self.increment_residuals(x).norm_squared()
    }

    /// Jacobian with respect to the free increments.
    pub(crate) fn increment_jacobian(&self, x: &[f64]) -> DMatrix<f64> {
        // o = L r with L lower-triangular ones, so J_r[:, k] = Σ_{i ≥ k} J_o[:, i].
        let mut j = self.jacobian(&cumulative(x));
        let n = j.ncols();
        for k in (0..n.saturating_sub(1)).rev() {
            for row in 0..j.nrows() {
                let next = j[(row, k + 1)];
                j[(row, k)] += next;
            }
        }
        j
    }

    /// Largest cosine between a Jacobian column and the residual vector at
    /// the free increments. Zero at a stationary point or an exact fit.
    pub(crate) fn gradient_cosine(&self, x: &[f64]) -> f64 {
        let f = self.increment_residuals(x);
        let f_norm = f.norm();
        if f_norm < RESIDUAL_FLOOR {
            return 0.0;
        }
        self.increment_jacobian(x)
            .column_iter()
            .map(|c| {
                let c_norm = c.norm();
                if c_norm > 0.0 {
                    c.dot(&f).abs() / (c_norm * f_norm)
                } else {
                    0.0
                }
            })
            .fold(0.0, f64::max)
    }
}

impl<T: ts_na::RealField> tiny_solver::factors::Factor<T> for Functional {
    fn residual_func(&self, params: &[ts_na::DVector<T>]) -> ts_na::DVector<T> {
        let mut o = Vec::with_capacity(params[0].len());
        let mut acc = ts_na::convert::<f64, T>(0.0);
        for r in params[0].iter() {
            acc = acc + r.clone();
            o.push(acc.clone());
        }
        self.residuals_generic(&o)
    }
}
