//! Periodic B-spline basis evaluation (Cox–de Boor on a periodically
//! extended knot vector).

/// Periodic knot sequence: `knots[0] = 0`, strictly increasing in `[0, 1)`,
/// extended by `knot(j + n) = knot(j) + 1`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PeriodicKnots<'a> {
    knots: &'a [f64],
}

impl<'a> PeriodicKnots<'a> {
    pub(crate) fn new(knots: &'a [f64]) -> Self {
        Self { knots }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.knots.len()
    }

    /// Knot at an arbitrary (possibly negative) index of the extended sequence.
    #[inline]
    pub(crate) fn at(&self, j: isize) -> f64 {
        let n = self.knots.len() as isize;
        let wraps = j.div_euclid(n);
        self.knots[j.rem_euclid(n) as usize] + wraps as f64
    }

    /// Index `s` with `knot(s) <= t < knot(s + 1)` for `t` in `[0, 1)`.
    #[inline]
    pub(crate) fn span(&self, t: f64) -> usize {
        let idx = self.knots.partition_point(|&k| k <= t);
        idx.saturating_sub(1)
    }

    /// Non-zero basis functions of degree `q` at `t` within span `s`.
    ///
    /// Entry `r` is the value of `N_{s-q+r, q}(t)` (NURBS Book A2.2).
    pub(crate) fn basis(&self, s: usize, t: f64, q: usize) -> Vec<f64> {
        let s = s as isize;
        let mut values = vec![0.0; q + 1];
        let mut left = vec![0.0; q + 1];
        let mut right = vec![0.0; q + 1];
        values[0] = 1.0;
        for j in 1..=q {
            left[j] = t - self.at(s + 1 - j as isize);
            right[j] = self.at(s + j as isize) - t;
            let mut saved = 0.0;
            for r in 0..j {
                let denom = right[r + 1] + left[j - r];
                let temp = if denom.abs() > f64::EPSILON {
                    values[r] / denom
                } else {
                    0.0
                };
                values[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            values[j] = saved;
        }
        values
    }
}

/// Reduce a parameter to `[0, 1)`.
#[inline]
pub(crate) fn wrap_unit(t: f64) -> f64 {
    let w = t.rem_euclid(1.0);
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

/// Coefficients of the `order`-th derivative curve, expressed on the basis of
/// degree `degree - order` over the same periodic knots.
pub(crate) fn derivative_coeffs(
    knots: PeriodicKnots<'_>,
    coeffs: &[f64],
    degree: usize,
    order: usize,
) -> Vec<f64> {
    let n = coeffs.len();
    let mut current = coeffs.to_vec();
    for k in 0..order {
        let p = degree - k;
        let mut next = vec![0.0; n];
        for (j, out) in next.iter_mut().enumerate() {
            let ji = j as isize;
            let span = knots.at(ji + p as isize) - knots.at(ji);
            let prev = current[(j + n - 1) % n];
            *out = if span > f64::EPSILON {
                p as f64 * (current[j] - prev) / span
            } else {
                0.0
            };
        }
        current = next;
    }
    current
}

/// Evaluate `Σ_j c_{j mod n} N_{j, q}(t)` at a wrapped parameter.
pub(crate) fn evaluate(knots: PeriodicKnots<'_>, coeffs: &[f64], q: usize, t: f64) -> f64 {
    let n = knots.len() as isize;
    let s = knots.span(t);
    let values = knots.basis(s, t, q);
    values
        .iter()
        .enumerate()
        .map(|(r, v)| {
            let j = s as isize - q as isize + r as isize;
            v * coeffs[j.rem_euclid(n) as usize]
        })
        .sum()
}
