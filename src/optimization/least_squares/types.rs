//! least_squares::types — shared numeric aliases and solver defaults.
//!
//! Purpose
//! -------
//! Centralize the numeric types used by the weighted least-squares layer so
//! the adapter, solver, and statistics code agree on shapes without naming
//! `ndarray` generics everywhere.
//!
//! Conventions
//! -----------
//! - `Theta` has length `p` (number of free parameters), in the positional
//!   order fixed by the caller.
//! - `Residuals`, `Predictions`, and `Weights` have length `n` (number of
//!   observations).
//! - `Jacobian` is a dense `n × p` matrix of derivatives of the weighted
//!   residuals (rows = observations, columns = parameters).
//! - `Cost` is the residual sum of squares `χ² = Σ r_k²`.
use argmin::core::IterState;
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Parameter vector `θ` in caller-defined positional order.
pub type Theta = Array1<f64>;

/// Weighted residual vector `w ⊙ (y − f(θ))`.
pub type Residuals = Array1<f64>;

/// Unweighted model predictions `f(θ)`.
pub type Predictions = Array1<f64>;

/// Per-observation weights multiplying the residuals.
pub type Weights = Array1<f64>;

/// Dense `n × p` Jacobian of the weighted residuals.
pub type Jacobian = Array2<f64>;

/// Residual sum of squares.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver.
///
/// Maps argmin counter names (e.g., `"operator_count"`) to counts.
pub type FnEvalMap = HashMap<String, u64>;

/// Solver state shared by the Levenberg–Marquardt solver and its runner.
pub type LmState = IterState<Theta, (), (), (), (), Cost>;

/// Default evaluation budget for a standalone solve.
pub const DEFAULT_MAX_NFEV: usize = 2000;

/// Default relative cost-reduction and step tolerances (MINPACK defaults).
pub const DEFAULT_FTOL: f64 = 1.5e-8;
pub const DEFAULT_XTOL: f64 = 1.5e-8;

/// Initial damping scale `τ` in `λ₀ = τ · max diag(JᵀJ)`.
pub const DEFAULT_DAMPING_SCALE: f64 = 1e-3;

/// Eigenvalues at or below this are treated as zero in pseudo-inverses.
pub const EIGEN_EPS: f64 = 1e-12;
