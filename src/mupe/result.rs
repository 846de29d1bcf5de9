//! Final artifact of a MUPE fit.
use crate::{
    mupe::params::ParameterVector,
    optimization::least_squares::{FitOutcome, FitStatistics, Predictions, Weights},
};

/// MupeResult — the last inner fit plus the bookkeeping of the outer loop.
///
/// Fields
/// ------
/// - `outcome`: [`FitOutcome`]
///   The final solver invocation (positional θ̂, predictions, diagnostics).
/// - `start`: [`ParameterVector`]
///   The caller's starting specification, unchanged.
/// - `fitted`: [`ParameterVector`]
///   Final values under the `start` names, in `start` order.
/// - `iterations`: `usize`
///   0-based index of the outer iteration that ended the loop: the
///   converging iteration, or `max_iter − 1` when the cap was hit.
/// - `converged`: `bool`
///   `false` iff the cap was hit without the coefficients stabilizing. Such
///   a result is returned, not raised, but deserves suspicion.
/// - `weights`: [`Weights`]
///   Weights used in the final solve.
/// - `statistics`: [`FitStatistics`]
///   χ², reduced χ², AIC/BIC, and parameter uncertainty of the final fit.
#[derive(Debug, Clone, PartialEq)]
pub struct MupeResult {
    pub outcome: FitOutcome,
    pub start: ParameterVector,
    pub fitted: ParameterVector,
    pub iterations: usize,
    pub converged: bool,
    pub weights: Weights,
    pub statistics: FitStatistics,
}

impl MupeResult {
    /// Fitted value of `name`.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.fitted.get(name)
    }

    /// Standard error of `name`, when the covariance could be estimated.
    pub fn stderr(&self, name: &str) -> Option<f64> {
        let k = self.fitted.names().position(name)?;
        self.statistics.stderr.as_ref().map(|se| se[k])
    }

    /// Predictions `f(X; θ̂)` of the final fit.
    pub fn best_fit(&self) -> &Predictions {
        &self.outcome.best_fit
    }

    /// Number of outer iterations executed (`iterations + 1`).
    pub fn outer_iterations(&self) -> usize {
        self.iterations + 1
    }
}
