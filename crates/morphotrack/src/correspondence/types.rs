use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::spline::wrap_unit;

// ── Error type ─────────────────────────────────────────────────────────────

/// Failure to establish point correspondence between consecutive curves.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrespondenceError {
    /// Start and initial end parameter sets differ in length or are empty.
    LengthMismatch {
        /// Number of start parameters.
        start: usize,
        /// Number of initial end parameters.
        initial: usize,
    },
    /// Start parameters are not strictly increasing within one period.
    InvalidStart {
        /// First offending index.
        index: usize,
    },
    /// Solver ran out of iterations.
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Sum of squared residuals at the last accepted iterate.
        cost: f64,
    },
    /// The solution crosses correspondences (cyclic order not preserved).
    OrderViolation {
        /// First index whose increment is not positive (`n` = wrap segment).
        index: usize,
    },
    /// Curve tangent vanishes at a start parameter.
    DegenerateTangent {
        /// Angular bin with the degenerate tangent.
        bin: usize,
    },
    /// The optimizer failed to produce a step (singular linear system).
    SingularStep,
    /// Residuals became NaN or infinite.
    NonFinite,
}

impl std::fmt::Display for CorrespondenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LengthMismatch { start, initial } => write!(
                f,
                "parameter set length mismatch: {} start vs {} initial",
                start, initial
            ),
            Self::InvalidStart { index } => {
                write!(f, "start parameters not cyclically ordered at index {}", index)
            }
            Self::NotConverged { iterations, cost } => write!(
                f,
                "correspondence solver did not converge after {} iterations (cost {:.3e})",
                iterations, cost
            ),
            Self::OrderViolation { index } => {
                write!(f, "correspondence crossing at index {}", index)
            }
            Self::DegenerateTangent { bin } => {
                write!(f, "degenerate curve tangent at bin {}", bin)
            }
            Self::SingularStep => write!(f, "singular damped normal equations"),
            Self::NonFinite => write!(f, "non-finite residuals"),
        }
    }
}

impl std::error::Error for CorrespondenceError {}

// ── Parameter sets ─────────────────────────────────────────────────────────

/// Ordered curve parameters naming one point per angular bin.
///
/// Values are kept unwrapped (continuous across the period boundary); use
/// [`ParameterSet::wrapped`] for values in `[0, 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: Vec<f64>,
}

impl ParameterSet {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// `n` equally spaced parameters centered in their bins and phase-shifted
    /// by `origin`: `origin + 0.5/n + i/n`.
    pub fn uniform(n: usize, origin: f64) -> Self {
        let step = 1.0 / n as f64;
        Self {
            values: (0..n)
                .map(|i| origin + 0.5 * step + i as f64 * step)
                .collect(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values reduced to `[0, 1)`.
    pub fn wrapped(&self) -> Vec<f64> {
        self.values.iter().map(|&v| wrap_unit(v)).collect()
    }

    /// First index breaking strict cyclic order, `Some(n)` for the wrap
    /// segment, `None` if ordered.
    pub fn order_violation(&self) -> Option<usize> {
        first_order_violation(&self.values)
    }
}

/// NaN increments count as violations.
fn is_positive(d: f64) -> bool {
    d.partial_cmp(&0.0) == Some(Ordering::Greater)
}

pub(crate) fn first_order_violation(values: &[f64]) -> Option<usize> {
    let n = values.len();
    if let Some(i) = (1..n).find(|&i| !is_positive(values[i] - values[i - 1])) {
        return Some(i);
    }
    if n > 0 && !is_positive(1.0 + values[0] - values[n - 1]) {
        return Some(n);
    }
    None
}

// ── Configuration ──────────────────────────────────────────────────────────

/// Direction of the local-speed ratio in the regularization residuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegularizationRatio {
    /// `√w · Δo / Δp` (end spacing over start spacing).
    #[default]
    EndOverStart,
    /// `√w · Δp / Δo` (start spacing over end spacing).
    StartOverEnd,
}

/// Correspondence solver parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrespondenceConfig {
    /// Weight `w` of the uniform-spacing regularization.
    pub weight: f64,
    /// Ratio direction of the regularization residuals.
    pub ratio: RegularizationRatio,
    /// Maximum Levenberg–Marquardt iterations.
    pub max_iters: usize,
    /// Stationarity tolerance: largest allowed cosine between a Jacobian
    /// column and the residual vector.
    pub gtol: f64,
}

impl Default for CorrespondenceConfig {
    fn default() -> Self {
        Self {
            weight: 0.01,
            ratio: RegularizationRatio::EndOverStart,
            max_iters: 200,
            gtol: 1e-6,
        }
    }
}

/// Solved correspondence for one frame transition.
#[derive(Debug, Clone)]
pub struct Correspondence {
    /// End parameters on the current curve, aligned with the start set.
    pub end: ParameterSet,
    /// Final sum of squared residuals.
    pub cost: f64,
    /// Optimizer iterations spent, counted in whole rounds.
    pub iterations: usize,
}
