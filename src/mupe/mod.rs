//! mupe — Minimum Unbiased Percent Error estimation by IRLS.
//!
//! Purpose
//! -------
//! Fit nonlinear multiplicative-error models `y = f(X; θ)·(1 + ε)` by
//! minimizing percent rather than absolute error. The estimator alternates
//! budget-limited weighted least-squares solves with reweighting by the
//! reciprocal of the fitted values until the coefficients stop moving.
//!
//! Key behaviors
//! -------------
//! - [`irls::mupe_nonlinear`] is the one-call entry point:
//!   `(model, y, X, start) ↦ MupeResult`.
//! - [`irls::MupeEstimator`] exposes the same driver with explicit
//!   [`options::MupeOptions`], an injectable solver, and cooperative
//!   cancellation through [`cancel::CancelToken`].
//! - Parameters are named by the caller ([`params::ParameterVector`]) but
//!   handled positionally in the order of `start`.
//!
//! Error model
//! -----------
//! - [`errors::MupeError`] classifies failures as configuration, evaluation,
//!   weight-domain, or cancellation errors ([`errors::MupeErrorKind`]).
//!   Hitting the iteration cap is not an error; see `MupeResult::converged`.

pub mod cancel;
pub mod convergence;
pub mod data;
pub mod errors;
pub mod irls;
pub mod model;
pub mod options;
pub mod params;
pub mod result;
pub mod weights;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::cancel::CancelToken;
pub use self::data::{Drivers, ObservationSet};
pub use self::errors::{IrlsResult, MupeError, MupeErrorKind};
pub use self::irls::{MupeEstimator, mupe_nonlinear};
pub use self::model::{FnModel, ModelFunction, NamedModel};
pub use self::options::MupeOptions;
pub use self::params::{ParamView, Parameter, ParameterNames, ParameterVector};
pub use self::result::MupeResult;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use mupe_regression::mupe::prelude::*;
//
// to import the estimator surface in a single line.

pub mod prelude {
    pub use super::cancel::CancelToken;
    pub use super::data::{Drivers, ObservationSet};
    pub use super::errors::{IrlsResult, MupeError, MupeErrorKind};
    pub use super::irls::{MupeEstimator, mupe_nonlinear};
    pub use super::model::{FnModel, ModelFunction};
    pub use super::options::MupeOptions;
    pub use super::params::{ParamView, ParameterVector};
    pub use super::result::MupeResult;
}
