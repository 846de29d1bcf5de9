//! Execution helper that runs the Levenberg–Marquardt solver on a weighted
//! residual problem and returns a crate-friendly [`FitOutcome`].
use crate::optimization::{
    errors::OptResult,
    least_squares::{
        adapter::WeightedResiduals,
        levenberg_marquardt::LevenbergMarquardt,
        traits::{CurveModel, EvaluationBudget, FitOutcome, LMOptions},
        types::{FnEvalMap, Theta},
        validation::{validate_predictions, validate_theta_hat},
    },
};
use argmin::core::{Executor, State};

/// Run a budgeted Levenberg–Marquardt solve.
///
/// Wires up:
/// - the weighted residual problem via [`WeightedResiduals`], metered to the
///   solver's evaluation budget,
/// - the configured [`LevenbergMarquardt`] solver,
/// - the initial parameter `theta0`,
/// - an iteration cap that can never bind before the evaluation budget,
/// - optional observers (behind the `obs_slog` feature),
///
/// then executes the solver and converts the final state into a
/// [`FitOutcome`]. `nfev` is the number of model evaluations the problem
/// charged. The predictions `f(θ̂)` reported in `best_fit` are evaluated once
/// more after the run and are not charged to the budget.
///
/// # Errors
/// - Propagates model errors raised during the run (recovered from the
///   `argmin` error box) and any other `argmin` runtime error.
/// - Propagates validation errors for `θ̂` and the final predictions.
pub fn run_levenberg_marquardt<'a, M>(
    theta0: Theta, opts: &LMOptions, problem: WeightedResiduals<'a, M>, solver: LevenbergMarquardt,
) -> OptResult<FitOutcome>
where
    M: CurveModel,
{
    let (model, y, weights) = (problem.model, problem.y, problem.weights);
    let problem = problem.with_budget(solver.max_nfev());
    // Rejected or refactored steps may cost no evaluation; leave head room.
    let max_iters = 4 * solver.max_nfev() as u64 + 4;

    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0).max_iters(max_iters));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    #[cfg(not(feature = "obs_slog"))]
    let _ = opts;

    let run = optimizer.run()?;
    let nfev = run.problem.problem.as_ref().map_or(0, |p| p.evaluations());
    let mut result = run.state;
    let iterations = result.get_iter();
    let fn_evals: FnEvalMap = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let theta_hat = validate_theta_hat(result.take_best_param().or_else(|| result.take_param()))?;

    let best_fit = model.predict(&theta_hat)?;
    validate_predictions(&best_fit, y.len())?;
    let residuals = (y - &best_fit) * weights;
    let njev = counter(&fn_evals, "jacobian_count");

    FitOutcome::new(
        Some(theta_hat),
        best_fit,
        residuals,
        termination,
        iterations,
        nfev,
        njev,
        fn_evals,
    )
}

fn counter(fn_evals: &FnEvalMap, key: &str) -> usize {
    fn_evals.get(key).copied().unwrap_or(0) as usize
}
