//! OriginTracker: running phase offset of the curve parametrization.
//!
//! For frame `k` the origin is the shift `o` that best aligns
//! `S(o + m/M)` with `S₀(origin[k−1] + m/M)`. The value accumulates without
//! reduction mod 1, and `origin[0] = 0` by convention.

use serde::{Deserialize, Serialize};

use crate::spline::SplineCurve;

/// Origin search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Number of alignment samples `M` along each curve.
    pub n_samples: usize,
    /// Coarse scan resolution over the search window.
    pub coarse_steps: usize,
    /// Half-width of the search window around the previous origin.
    pub search_halfwidth: f64,
    /// Evaluation budget of the bracket refinement.
    pub max_evals: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            n_samples: 128,
            coarse_steps: 64,
            search_halfwidth: 0.5,
            max_evals: 60,
        }
    }
}

/// Tracks the accumulated origin across a sequence.
#[derive(Debug, Clone)]
pub struct OriginTracker {
    config: OriginConfig,
    current: f64,
}

impl OriginTracker {
    /// Tracker positioned at frame 0 (`origin = 0`).
    pub fn new(config: OriginConfig) -> Self {
        Self {
            config,
            current: 0.0,
        }
    }

    /// Origin of the most recently processed frame.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Estimate the origin of the next frame from the previous and current
    /// curves without committing it.
    pub fn estimate(&self, previous: &SplineCurve, current: &SplineCurve) -> f64 {
        find_origin(previous, current, self.current, &self.config)
    }

    /// Commit an origin produced by [`OriginTracker::estimate`].
    pub fn advance(&mut self, origin: f64) {
        self.current = origin;
    }
}

/// Alignment shift of `current` relative to `previous`, seeded at `prev_origin`.
pub fn find_origin(
    previous: &SplineCurve,
    current: &SplineCurve,
    prev_origin: f64,
    config: &OriginConfig,
) -> f64 {
    let m = config.n_samples.max(8);
    let reference = previous.sample_uniform(m, prev_origin);
    let energy = |o: f64| -> f64 {
        reference
            .iter()
            .enumerate()
            .map(|(j, r)| {
                let p = current.eval(o + j as f64 / m as f64);
                (p[0] - r[0]).powi(2) + (p[1] - r[1]).powi(2)
            })
            .sum()
    };

    let h = config.search_halfwidth.clamp(1e-3, 0.5);
    let steps = config.coarse_steps.max(4);
    let lo = prev_origin - h;
    let cell = 2.0 * h / steps as f64;

    let mut best_k = 0usize;
    let mut best_e = f64::INFINITY;
    for k in 0..=steps {
        let e = energy(lo + k as f64 * cell);
        if e < best_e {
            best_e = e;
            best_k = k;
        }
    }

    let center = lo + best_k as f64 * cell;
    let (origin, e) = refine_bracket(
        energy,
        (center - cell, center + cell),
        (center, best_e),
        config.max_evals,
    );

    tracing::trace!(prev_origin, origin, energy = e, "origin updated");
    origin
}

/// Bracket width below which the origin is considered resolved.
const ORIGIN_TOL: f64 = 1e-10;

/// Shrink the bracket `lo < mid < hi` around a local minimum of `energy`.
///
/// `best` holds `mid` and its known energy, which must not exceed the energy
/// at either end (the coarse-scan minimum satisfies this). Each step
/// evaluates the golden-ratio point of the longer side, so the returned energy
/// never exceeds the seed's.
fn refine_bracket(
    energy: impl Fn(f64) -> f64,
    (mut lo, mut hi): (f64, f64),
    best: (f64, f64),
    max_evals: usize,
) -> (f64, f64) {
    const GOLDEN: f64 = 0.381_966_011_250_105;

    let (mut mid, mut e_mid) = best;
    for _ in 0..max_evals {
        if hi - lo <= ORIGIN_TOL {
            break;
        }
        let right = hi - mid > mid - lo;
        let trial = if right {
            mid + GOLDEN * (hi - mid)
        } else {
            mid - GOLDEN * (mid - lo)
        };
        let e = energy(trial);
        if e < e_mid {
            if right {
                lo = mid;
            } else {
                hi = mid;
            }
            mid = trial;
            e_mid = e;
        } else if right {
            hi = trial;
        } else {
            lo = trial;
        }
    }
    (mid, e_mid)
}
