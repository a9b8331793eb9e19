//! CorrespondenceSolver: maps start parameters on the previous curve to end
//! parameters on the current curve by minimizing a joint geometric and
//! uniform-spacing least-squares functional under periodic boundary
//! conditions.

mod functional;
mod types;

use std::collections::HashMap;

use tiny_solver::factors::na as ts_na;
use tiny_solver::Optimizer;

use crate::spline::SplineCurve;

pub use functional::{inverse_transform, transform, Functional};
pub use types::{
    Correspondence, CorrespondenceConfig, CorrespondenceError, ParameterSet, RegularizationRatio,
};

/// Parameter block name of the free increments.
const INCREMENTS: &str = "r";

/// Optimizer iterations between stationarity checks.
const ROUND_ITERS: usize = 10;

/// Solver for one frame transition.
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceSolver {
    config: CorrespondenceConfig,
}

impl CorrespondenceSolver {
    pub fn new(config: CorrespondenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CorrespondenceConfig {
        &self.config
    }

    /// Find end parameters on `current` corresponding to `start` on
    /// `previous`, starting the search from `initial`.
    ///
    /// A result that crosses correspondences is an error, never a value.
    pub fn solve(
        &self,
        previous: &SplineCurve,
        current: &SplineCurve,
        start: &ParameterSet,
        initial: &ParameterSet,
    ) -> Result<Correspondence, CorrespondenceError> {
        let n = start.len();
        if n == 0 || initial.len() != n {
            return Err(CorrespondenceError::LengthMismatch {
                start: n,
                initial: initial.len(),
            });
        }
        if let Some(index) = start.order_violation() {
            return Err(CorrespondenceError::InvalidStart { index });
        }
        if let Some(index) = initial.order_violation() {
            return Err(CorrespondenceError::OrderViolation { index });
        }

        let functional = Functional::new(
            previous,
            current,
            start.values(),
            self.config.weight,
            self.config.ratio,
        );
        let mut x = transform(initial.values())[..n].to_vec();
        if !functional.cost(&x).is_finite() {
            return Err(CorrespondenceError::NonFinite);
        }

        let mut problem = tiny_solver::Problem::new();
        problem.add_residual_block(3 * n, &[INCREMENTS], Box::new(functional.clone()), None);
        let optimizer = tiny_solver::LevenbergMarquardtOptimizer::default();

        // The optimizer stops on its own only by iteration count, so it runs
        // in short rounds with a scale-free stationarity test in between.
        let mut iterations = 0;
        while functional.gradient_cosine(&x) > self.config.gtol {
            if iterations >= self.config.max_iters {
                return Err(CorrespondenceError::NotConverged {
                    iterations,
                    cost: functional.cost(&x),
                });
            }
            let budget = ROUND_ITERS.min(self.config.max_iters - iterations);
            let options = tiny_solver::OptimizerOptions {
                max_iteration: budget,
                verbosity_level: 0,
                min_abs_error_decrease_threshold: 0.0,
                min_rel_error_decrease_threshold: 0.0,
                min_error_threshold: 0.0,
                ..Default::default()
            };
            let initial_values = HashMap::from([(
                INCREMENTS.to_string(),
                ts_na::DVector::<f64>::from_vec(x.clone()),
            )]);
            let result = optimizer
                .optimize(&problem, &initial_values, Some(options))
                .ok_or(CorrespondenceError::SingularStep)?;
            let next = result
                .get(INCREMENTS)
                .ok_or(CorrespondenceError::SingularStep)?;
            x = next.as_slice().to_vec();
            iterations += budget;
            if !functional.cost(&x).is_finite() {
                return Err(CorrespondenceError::NonFinite);
            }
        }

        let cost = functional.cost(&x);
        x.push(0.0);
        let end = ParameterSet::new(inverse_transform(&x));
        if let Some(index) = end.order_violation() {
            tracing::debug!(index, iterations, cost, "correspondence crosses after solve");
            return Err(CorrespondenceError::OrderViolation { index });
        }

        tracing::debug!(n_points = n, iterations, cost, "correspondence solved");

        Ok(Correspondence {
            end,
            cost,
            iterations,
        })
    }
}
