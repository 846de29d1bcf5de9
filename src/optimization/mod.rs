//! optimization — weighted nonlinear least-squares machinery.
//!
//! Purpose
//! -------
//! Group the numerical solver layer the MUPE driver delegates to:
//! - [`errors`]: the `OptError` / `OptResult` surface shared by every solver
//!   component, including conversions from `argmin` errors.
//! - [`least_squares`]: the solver contract, the budgeted Levenberg–Marquardt
//!   implementation, finite-difference Jacobians, and fit statistics.
//!
//! Conventions
//! -----------
//! - Nothing in this module knows about parameter names or reweighting; it
//!   works on positional `Theta` vectors and caller-supplied weights.

pub mod errors;
pub mod least_squares;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use mupe_regression::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::least_squares::prelude::*;
}
