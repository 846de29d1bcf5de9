//! Public API surface for weighted nonlinear least squares.
//!
//! - [`CurveModel`]: trait a model implements to be fitted (θ ↦ predictions).
//! - [`LeastSquaresSolver`]: the solver contract consumed by the IRLS driver.
//! - [`LMOptions`], [`Tolerances`], and [`DiffScheme`]: solver configuration.
//! - [`FitOutcome`]: normalized result of one solver invocation.
//!
//! Convention: the solver minimizes `χ²(θ) = Σ_k (w_k · (y_k − f_k(θ)))²`. A
//! weight multiplies the residual, so it enters the objective squared.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        types::{
            Cost, DEFAULT_DAMPING_SCALE, DEFAULT_FTOL, DEFAULT_MAX_NFEV, DEFAULT_XTOL, FnEvalMap,
            Jacobian, Predictions, Residuals, Theta, Weights,
        },
        validation::{validate_theta_hat, verify_ftol, verify_gtol, verify_max_nfev, verify_xtol},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use ndarray::Array1;
use std::str::FromStr;

/// A model whose predictions are fitted to observed responses.
///
/// Implementors close over their driver values; the solver only ever hands
/// them a parameter vector in the caller's positional order.
///
/// Required:
/// - `predict(&Theta) -> OptResult<Predictions>`: evaluate `f(θ)` for all
///   observations. Return a descriptive `OptError` when the model cannot be
///   evaluated at `θ`; the error aborts the fit.
///
/// Optional:
/// - `jacobian(&Theta) -> OptResult<Jacobian>`: analytic `∂f/∂θ` as an
///   `n × p` matrix of the *unweighted* predictions. When not implemented,
///   finite differences of the weighted residuals are used.
pub trait CurveModel {
    // Required methods
    fn predict(&self, theta: &Theta) -> OptResult<Predictions>;

    // Optional methods
    fn jacobian(&self, _theta: &Theta) -> OptResult<Jacobian> {
        Err(OptError::JacobianNotImplemented)
    }
}

/// A problem that meters its own model evaluations.
///
/// The budgeted solver consults this before committing to work it may not be
/// able to pay for; the problem itself refuses evaluations past the cap.
pub trait EvaluationBudget {
    /// Model evaluations charged so far.
    fn evaluations(&self) -> usize;

    /// Evaluations still available, or `None` if the problem is unmetered.
    fn remaining(&self) -> Option<usize>;
}

/// Contract of a bounded-budget weighted least-squares solver.
///
/// `solve` starts from `theta0`, minimizes `Σ (w ⊙ (y − f(θ)))²`, and makes at
/// most `max_nfev` model evaluations: one per residual vector, including each
/// finite-difference column, and one per analytic Jacobian. It is not required to
/// reach its own convergence criterion: exhausting the budget is a normal,
/// non-error return carrying the best parameters seen.
///
/// Implementations must return `theta_hat` in the same positional order as
/// `theta0` and `best_fit = f(theta_hat)` for every observation.
pub trait LeastSquaresSolver {
    fn solve<M: CurveModel>(
        &self, model: &M, y: &Array1<f64>, theta0: Theta, weights: &Weights, max_nfev: usize,
    ) -> OptResult<FitOutcome>;
}

/// Finite-difference scheme used when a model has no analytic Jacobian.
///
/// Parsing:
/// Implements `FromStr`, accepting case-insensitive `"forward"` and
/// `"central"`. Unknown names return `OptError::InvalidDiffScheme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffScheme {
    Forward,
    Central,
}

impl FromStr for DiffScheme {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(DiffScheme::Forward),
            "central" => Ok(DiffScheme::Central),
            _ => Err(OptError::InvalidDiffScheme {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'forward' or 'central'.",
            }),
        }
    }
}

/// Solver stopping tolerances.
///
/// - `ftol`: stop when an accepted step reduces `χ²` by a relative amount
///   `≤ ftol`.
/// - `xtol`: stop when `‖δ‖ ≤ xtol · (‖θ‖ + xtol)`.
/// - `gtol`: stop when `‖Jᵀr‖∞ ≤ gtol`.
///
/// All three must be finite and non-negative (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Errors
    /// - [`OptError::InvalidFTol`] / [`OptError::InvalidXTol`] /
    ///   [`OptError::InvalidGTol`] for non-finite or negative values.
    pub fn new(ftol: f64, xtol: f64, gtol: f64) -> OptResult<Self> {
        verify_ftol(ftol)?;
        verify_xtol(xtol)?;
        verify_gtol(gtol)?;
        Ok(Self { ftol, xtol, gtol })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { ftol: DEFAULT_FTOL, xtol: DEFAULT_XTOL, gtol: 0.0 }
    }
}

/// Solver-level configuration.
///
/// Fields:
/// - `tols: Tolerances` — stopping tolerances.
/// - `diff_scheme: DiffScheme` — finite-difference scheme for Jacobians.
/// - `max_nfev: usize` — evaluation budget for standalone solves. The IRLS
///   driver overrides it per call with its own budget.
/// - `damping_scale: f64` — `τ` in the initial damping `λ₀ = τ · max diag(JᵀJ)`.
/// - `verbose: bool` — if `true`, attaches an observer (behind the `obs_slog`
///   feature) and prints solver progress.
///
/// Default:
/// - `tols`: `ftol = xtol = 1.5e-8`, `gtol = 0`
/// - `diff_scheme`: `Forward`
/// - `max_nfev`: `2000`
/// - `damping_scale`: `1e-3`
/// - `verbose`: `false`
#[derive(Debug, Clone, PartialEq)]
pub struct LMOptions {
    pub tols: Tolerances,
    pub diff_scheme: DiffScheme,
    pub max_nfev: usize,
    pub damping_scale: f64,
    pub verbose: bool,
}

impl LMOptions {
    /// Create validated solver options.
    ///
    /// # Errors
    /// - [`OptError::InvalidMaxNfev`] if `max_nfev < 2`.
    /// - [`OptError::InvalidParameter`] if `damping_scale` is not finite and
    ///   strictly positive.
    pub fn new(
        tols: Tolerances, diff_scheme: DiffScheme, max_nfev: usize, damping_scale: f64,
        verbose: bool,
    ) -> OptResult<Self> {
        verify_max_nfev(max_nfev)?;
        if !(damping_scale.is_finite() && damping_scale > 0.0) {
            return Err(OptError::InvalidParameter {
                text: format!("damping scale must be finite and positive, got {damping_scale}"),
            });
        }
        Ok(Self { tols, diff_scheme, max_nfev, damping_scale, verbose })
    }
}

impl Default for LMOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            diff_scheme: DiffScheme::Forward,
            max_nfev: DEFAULT_MAX_NFEV,
            damping_scale: DEFAULT_DAMPING_SCALE,
            verbose: false,
        }
    }
}

/// Canonical result of one solver invocation.
///
/// - `theta_hat`: best parameter vector found, positional order of `theta0`.
/// - `best_fit`: unweighted predictions `f(θ̂)` for every observation.
/// - `residuals`: weighted residuals `w ⊙ (y − f(θ̂))`.
/// - `chisqr`: `Σ residuals²`.
/// - `converged`: `true` only if the solver met one of its own tolerances;
///   a budget-limited partial solve reports `false`.
/// - `status`: human-readable termination status.
/// - `iterations`: solver iterations performed.
/// - `nfev`: model evaluations charged to the budget, finite-difference
///   columns included.
/// - `njev`: Jacobians formed, analytic or finite-difference.
/// - `fn_evals`: raw argmin counters.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub theta_hat: Theta,
    pub best_fit: Predictions,
    pub residuals: Residuals,
    pub chisqr: Cost,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub nfev: usize,
    pub njev: usize,
    pub fn_evals: FnEvalMap,
}

impl FitOutcome {
    /// Build a validated [`FitOutcome`] from raw solver state.
    ///
    /// Performs:
    /// - `theta_hat` check via `validate_theta_hat` (present and all finite).
    /// - Maps `TerminationStatus` into `(converged, status)`.
    /// - Computes `chisqr` from `residuals`.
    ///
    /// # Errors
    /// - Propagates validation errors for `theta_hat`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        theta_hat_opt: Option<Theta>, best_fit: Predictions, residuals: Residuals,
        termination: TerminationStatus, iterations: u64, nfev: usize, njev: usize,
        fn_evals: FnEvalMap,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {
                (true, "Solver converged".to_string())
            }
            TerminationStatus::Terminated(TerminationReason::SolverExit(reason)) => (false, reason),
            TerminationStatus::Terminated(reason) => (false, format!("{reason:?}")),
        };
        let chisqr = residuals.dot(&residuals);
        Ok(Self {
            theta_hat,
            best_fit,
            residuals,
            chisqr,
            converged,
            status,
            iterations: iterations as usize,
            nfev,
            njev,
            fn_evals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // `DiffScheme` parses case-insensitively and rejects unknown names.
    fn diff_scheme_from_str_is_case_insensitive() {
        assert_eq!("Forward".parse::<DiffScheme>(), Ok(DiffScheme::Forward));
        assert_eq!("CENTRAL".parse::<DiffScheme>(), Ok(DiffScheme::Central));
        assert!(matches!(
            "backward".parse::<DiffScheme>(),
            Err(OptError::InvalidDiffScheme { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `LMOptions::new` enforces the budget floor and a positive damping scale.
    //
    // Expect
    // ------
    // - `max_nfev = 1` fails with `InvalidMaxNfev`.
    // - `damping_scale = 0` fails with `InvalidParameter`.
    fn lm_options_new_validates_budget_and_damping() {
        let tols = Tolerances::default();
        assert!(matches!(
            LMOptions::new(tols, DiffScheme::Forward, 1, 1e-3, false),
            Err(OptError::InvalidMaxNfev { .. })
        ));
        assert!(matches!(
            LMOptions::new(tols, DiffScheme::Forward, 10, 0.0, false),
            Err(OptError::InvalidParameter { .. })
        ));
        assert!(LMOptions::new(tols, DiffScheme::Central, 10, 1e-3, false).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Budget exhaustion is a soft stop: the outcome is valid but not converged,
    // and the status carries the solver's exit message.
    //
    // Given
    // -----
    // - `TerminationReason::SolverExit("evaluation budget exhausted")`.
    //
    // Expect
    // ------
    // - `converged == false`, status equals the message, `chisqr = Σ r²`.
    fn fit_outcome_maps_solver_exit_to_not_converged() {
        // Arrange
        let residuals = array![1.0, -2.0];
        let status = TerminationStatus::Terminated(TerminationReason::SolverExit(
            "evaluation budget exhausted".to_string(),
        ));

        // Act
        let out = FitOutcome::new(
            Some(array![1.0]),
            array![3.0, 4.0],
            residuals,
            status,
            4,
            6,
            4,
            FnEvalMap::new(),
        )
        .expect("outcome should be valid");

        // Assert
        assert!(!out.converged);
        assert_eq!(out.status, "evaluation budget exhausted");
        assert_eq!(out.chisqr, 5.0);
        assert_eq!(out.iterations, 4);
    }

    #[test]
    // Purpose
    // -------
    // A solver-reported convergence maps to `converged == true`.
    fn fit_outcome_maps_solver_converged() {
        let out = FitOutcome::new(
            Some(array![1.0]),
            array![1.0],
            array![0.0],
            TerminationStatus::Terminated(TerminationReason::SolverConverged),
            1,
            2,
            1,
            FnEvalMap::new(),
        )
        .expect("outcome should be valid");
        assert!(out.converged);
    }
}
