//! mupe::irls — the MUPE iteratively reweighted least-squares driver.
//!
//! Purpose
//! -------
//! Estimate a multiplicative-error model `y = f(X; θ)·(1 + ε)` by
//! minimizing percent error. Each outer iteration runs a warm-started,
//! budget-limited weighted least-squares solve, reweights every observation
//! by the reciprocal of its new prediction, and stops once two successive
//! coefficient vectors are elementwise close.
//!
//! Key behaviors
//! -------------
//! - The first solve uses unit weights; solve `i + 1` uses `1 / f(X; θ̂_i)`.
//! - Every solve starts from the previous θ̂ with a fresh evaluation budget
//!   (`MupeOptions::max_nfev`), so parameters and weights converge jointly
//!   rather than through nested full optimizations.
//! - Reaching `max_iter` without convergence returns the last fit with
//!   `converged == false`; it is not an error.
//! - Model failures, non-positive predictions, and cancellation abort the fit
//!   without a partial result.
//!
//! Invariants & assumptions
//! ------------------------
//! - Positional order of θ is the order of `start` for every solve and for
//!   every comparison; parameter vectors are rebuilt wholesale, never edited.
//! - Weights handed to the solver are strictly positive and finite.
//! - `len(y) ≥ len(start)` is assumed, not checked; identifiability is the
//!   solver's concern.
//!
//! Logging
//! -------
//! - One `debug` record per outer iteration (χ², largest coefficient change,
//!   evaluations), an `info` record on convergence and a `warn` record when
//!   the iteration cap is hit, all on `MupeOptions::logger`.
use crate::{
    mupe::{
        cancel::CancelToken,
        convergence::{all_close, max_abs_change},
        data::{Drivers, ObservationSet},
        errors::{IrlsResult, MupeError},
        model::{ModelFunction, NamedModel},
        options::MupeOptions,
        params::ParameterVector,
        result::MupeResult,
        weights::{reciprocal_weights, uniform_weights},
    },
    optimization::least_squares::{
        FitOutcome, LeastSquaresSolver, LmLeastSquares, Weights, fit_statistics,
    },
};
use ndarray::Array1;
use slog::{Logger, debug, info, o, warn};

/// MupeEstimator — IRLS driver generic over the inner least-squares solver.
///
/// The default solver is the budgeted Levenberg–Marquardt implementation
/// [`LmLeastSquares`]; any [`LeastSquaresSolver`] honoring the same contract
/// can be injected with [`MupeEstimator::with_solver`].
#[derive(Debug, Clone)]
pub struct MupeEstimator<S = LmLeastSquares> {
    solver: S,
    opts: MupeOptions,
}

impl MupeEstimator<LmLeastSquares> {
    /// Driver using the default Levenberg–Marquardt solver configured from
    /// `opts.lm`.
    pub fn new(opts: MupeOptions) -> Self {
        Self { solver: LmLeastSquares::new(opts.lm.clone()), opts }
    }
}

impl Default for MupeEstimator<LmLeastSquares> {
    fn default() -> Self {
        Self::new(MupeOptions::default())
    }
}

impl<S: LeastSquaresSolver> MupeEstimator<S> {
    pub fn with_solver(solver: S, opts: MupeOptions) -> Self {
        Self { solver, opts }
    }

    pub fn options(&self) -> &MupeOptions {
        &self.opts
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Fit `model` to `data` starting from `start`.
    ///
    /// # Errors
    /// See [`MupeEstimator::fit_with_cancel`]; this variant cannot be
    /// cancelled.
    pub fn fit<F: ModelFunction + ?Sized>(
        &self, model: &F, data: &ObservationSet, start: &ParameterVector,
    ) -> IrlsResult<MupeResult> {
        self.fit_with_cancel(model, data, start, &CancelToken::new())
    }

    /// Fit `model` to `data` starting from `start`, polling `cancel` before
    /// every outer iteration.
    ///
    /// # Errors
    /// - [`MupeError::InvalidOption`] if the options fail validation.
    /// - [`MupeError::Evaluation`] if a solve fails (model errors included).
    /// - [`MupeError::SolverOutputMismatch`] if the solver returns vectors of
    ///   the wrong length.
    /// - [`MupeError::NonPositivePrediction`] if a fit predicts a value that
    ///   cannot be reweighted.
    /// - [`MupeError::Cancelled`] / [`MupeError::TimedOut`] from `cancel`.
    pub fn fit_with_cancel<F: ModelFunction + ?Sized>(
        &self, model: &F, data: &ObservationSet, start: &ParameterVector, cancel: &CancelToken,
    ) -> IrlsResult<MupeResult> {
        self.opts.validate()?;
        let log = self.opts.logger.new(o!("n_obs" => data.n_obs(), "n_params" => start.len()));
        let bound = NamedModel::new(model, data.x(), start.names());

        let mut params = start.clone();
        let mut weights = uniform_weights(data.n_obs());
        for iteration in 0..self.opts.max_iter {
            cancel.check(iteration)?;
            let outcome = self.solver.solve(
                &bound,
                data.y(),
                params.values().clone(),
                &weights,
                self.opts.max_nfev,
            )?;
            check_outcome_shape(&outcome, data.n_obs())?;
            let next_weights = reciprocal_weights(&outcome.best_fit, iteration)?;
            let fitted = params.with_values(outcome.theta_hat.clone())?;
            let converged =
                all_close(params.values(), fitted.values(), self.opts.atol, self.opts.rtol);
            debug!(log, "outer iteration";
                "iteration" => iteration,
                "chisqr" => outcome.chisqr,
                "max_abs_change" => max_abs_change(params.values(), fitted.values()),
                "nfev" => outcome.nfev,
                "njev" => outcome.njev,
                "solver_status" => &outcome.status
            );

            if converged || iteration + 1 == self.opts.max_iter {
                return self.finish(
                    &log, &bound, data, start, outcome, fitted, weights, iteration, converged,
                );
            }
            params = fitted;
            weights = next_weights;
        }
        Err(MupeError::InvalidOption {
            option: "max_iter",
            reason: "at least one outer iteration is required".to_string(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn finish<F: ModelFunction + ?Sized>(
        &self, log: &Logger, bound: &NamedModel<'_, F>, data: &ObservationSet,
        start: &ParameterVector, outcome: FitOutcome, fitted: ParameterVector, weights: Weights,
        iterations: usize, converged: bool,
    ) -> IrlsResult<MupeResult> {
        let statistics = fit_statistics(
            bound,
            data.y(),
            &weights,
            &outcome.theta_hat,
            outcome.chisqr,
            self.opts.lm.diff_scheme,
        );
        if converged {
            info!(log, "MUPE converged"; "iterations" => iterations, "chisqr" => outcome.chisqr);
        } else {
            warn!(log, "MUPE did not converge; returning last fit";
                "max_iter" => self.opts.max_iter,
                "chisqr" => outcome.chisqr
            );
        }
        Ok(MupeResult {
            outcome,
            start: start.clone(),
            fitted,
            iterations,
            converged,
            weights,
            statistics,
        })
    }
}

fn check_outcome_shape(outcome: &FitOutcome, n_obs: usize) -> IrlsResult<()> {
    if outcome.best_fit.len() != n_obs {
        return Err(MupeError::SolverOutputMismatch {
            output: "predictions",
            expected: n_obs,
            found: outcome.best_fit.len(),
        });
    }
    Ok(())
}

/// mupe_nonlinear — fit a nonlinear multiplicative-error model by MUPE.
///
/// Validates `start` and the data, then runs [`MupeEstimator`] with default
/// options (200 outer iterations, 10 evaluations per solve, `atol = 1e-8`,
/// `rtol = 1e-5`).
///
/// Parameters
/// ----------
/// - `model`: `&F`
///   Model function `(X, params) ↦ predictions`.
/// - `y`: `Array1<f64>`
///   Observed responses, length n.
/// - `x`: [`Drivers`]
///   Driver values, `n × k`.
/// - `start`: `(name, value)` pairs
///   Initial guess; their order fixes the parameter order of the fit.
///
/// # Errors
/// - Configuration errors for malformed `start` or data.
/// - Everything [`MupeEstimator::fit_with_cancel`] returns.
///
/// # Example
/// ```
/// use ndarray::array;
/// use mupe_regression::mupe::{data::Drivers, irls::mupe_nonlinear, model::FnModel, params::ParamView};
///
/// let power = FnModel::new(|x: &Drivers, p: &ParamView<'_>| {
///     let (a, b) = (p.get("a")?, p.get("b")?);
///     Ok(x.column(0).mapv(|v| a * v.powf(b)))
/// });
/// let x = array![[1.0], [4.0], [9.0], [16.0], [25.0]];
/// let y = array![2.02, 3.96, 6.03, 7.96, 10.0];
///
/// let fit = mupe_nonlinear(&power, y, x, [("a", 1.0), ("b", 1.0)])?;
/// assert!(fit.converged);
/// assert!((fit.value("b").unwrap() - 0.5).abs() < 0.01);
/// # Ok::<(), mupe_regression::mupe::errors::MupeError>(())
/// ```
pub fn mupe_nonlinear<F, I, N>(
    model: &F, y: Array1<f64>, x: Drivers, start: I,
) -> IrlsResult<MupeResult>
where
    F: ModelFunction + ?Sized,
    I: IntoIterator<Item = (N, f64)>,
    N: Into<String>,
{
    let start = ParameterVector::from_pairs(start)?;
    let data = ObservationSet::new(y, x)?;
    MupeEstimator::default().fit(model, &data, &start)
}
