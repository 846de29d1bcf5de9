//! least_squares — budgeted, argmin-powered weighted nonlinear least squares.
//!
//! Purpose
//! -------
//! Provide the solver layer used by the MUPE driver: minimize
//! `Σ_k (w_k · (y_k − f_k(θ)))²` for a user model `f`, spending at most a
//! fixed number of model evaluations per call. Callers
//! implement [`CurveModel`] and either call [`least_squares`] directly or
//! hand a [`LeastSquaresSolver`] (default: [`LmLeastSquares`]) to a driver.
//!
//! Key behaviors
//! -------------
//! - Expose weighted residuals and their Jacobian to argmin through
//!   [`adapter::WeightedResiduals`].
//! - Run a Levenberg–Marquardt [`argmin::core::Solver`]
//!   ([`levenberg_marquardt::LevenbergMarquardt`]) with a hard evaluation
//!   budget; exhausting it is a soft stop, not an error.
//! - Fall back to finite-difference Jacobians ([`finite_diff`]) when the
//!   model provides none.
//! - Normalize results into a [`FitOutcome`] and, on request, compute
//!   [`FitStatistics`] (χ², reduced χ², AIC, BIC, covariance).
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters are positional (`Theta`); naming is the caller's concern.
//! - Weights multiply residuals. A zero weight removes an observation.
//! - Model errors abort the solve and propagate as [`OptError`] unchanged.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; the `api` tests exercise full
//!   solves on noiseless problems and the budget semantics.
//!
//! [`OptError`]: crate::optimization::errors::OptError

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod levenberg_marquardt;
pub mod run;
pub mod stats;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::{LmLeastSquares, least_squares};
pub use self::stats::{FitStatistics, fit_statistics};
pub use self::traits::{
    CurveModel, DiffScheme, FitOutcome, LMOptions, LeastSquaresSolver, Tolerances,
};
pub use self::types::{DEFAULT_MAX_NFEV, Jacobian, Predictions, Residuals, Theta, Weights};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use mupe_regression::optimization::least_squares::prelude::*;
//
// to import the main solver surface in a single line.

pub mod prelude {
    pub use super::api::{LmLeastSquares, least_squares};
    pub use super::stats::FitStatistics;
    pub use super::traits::{CurveModel, FitOutcome, LMOptions, LeastSquaresSolver, Tolerances};
    pub use super::types::{Theta, Weights};
}
