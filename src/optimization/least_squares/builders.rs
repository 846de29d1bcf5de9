//! least_squares::builders — Levenberg–Marquardt solver construction.
//!
//! Purpose
//! -------
//! Turn crate-level [`LMOptions`] plus a per-call evaluation budget into a
//! configured [`LevenbergMarquardt`] solver, keeping the initial parameter
//! vector and executor wiring in the runner layer.
//!
//! Conventions
//! -----------
//! - The budget passed here overrides `opts.max_nfev`; the IRLS driver uses
//!   this to cap every partial solve independently of the standalone
//!   default.
//! - Errors are reported via [`OptResult`]; no `argmin` types leak.
use crate::optimization::{
    errors::OptResult,
    least_squares::{
        levenberg_marquardt::LevenbergMarquardt, traits::LMOptions, validation::verify_max_nfev,
    },
};

/// build_levenberg_marquardt — construct a budgeted LM solver.
///
/// Parameters
/// ----------
/// - `opts`: `&LMOptions`
///   Source of the tolerances and initial damping scale.
/// - `max_nfev`: `usize`
///   Model evaluation budget for this solve.
///
/// Returns
/// -------
/// `OptResult<LevenbergMarquardt>`
///
/// Errors
/// ------
/// - `OptError::InvalidMaxNfev` if `max_nfev < 2`.
pub fn build_levenberg_marquardt(opts: &LMOptions, max_nfev: usize) -> OptResult<LevenbergMarquardt> {
    verify_max_nfev(max_nfev)?;
    Ok(LevenbergMarquardt::new(opts.tols, max_nfev, opts.damping_scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;

    #[test]
    // Purpose
    // -------
    // The per-call budget, not `opts.max_nfev`, configures the solver.
    //
    // Given
    // -----
    // - Default options (`max_nfev = 2000`) and a per-call budget of 10.
    //
    // Expect
    // ------
    // - The solver reports a budget of 10.
    fn per_call_budget_overrides_options_default() {
        let opts = LMOptions::default();

        let solver = build_levenberg_marquardt(&opts, 10).expect("budget of 10 is valid");

        assert_eq!(solver.max_nfev(), 10);
    }

    #[test]
    // Purpose
    // -------
    // Budgets that cannot pay for the starting point are rejected.
    fn budget_below_two_is_rejected() {
        let opts = LMOptions::default();

        let err = build_levenberg_marquardt(&opts, 1).unwrap_err();

        assert!(matches!(err, OptError::InvalidMaxNfev { max_nfev: 1, .. }));
    }
}
