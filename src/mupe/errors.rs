//! Errors for the MUPE driver (configuration checks, model evaluation
//! failures, reweighting domain violations, and cooperative cancellation).
//!
//! This module defines [`MupeError`], the single error type returned by the
//! IRLS driver, and [`MupeErrorKind`], the coarse classification callers can
//! match on without caring about the exact variant.
//!
//! ## Conventions
//! - **Indices are 0-based**; `iteration` is the 0-based outer-loop index.
//! - Every hard error aborts the fit; no partial results are returned.
//! - Solver-layer failures (model errors included) arrive as [`OptError`] and
//!   are wrapped in [`MupeError::Evaluation`] unchanged.
use crate::optimization::errors::OptError;

/// Result alias for IRLS driver operations that may produce [`MupeError`].
pub type IrlsResult<T> = Result<T, MupeError>;

/// Coarse classification of [`MupeError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MupeErrorKind {
    /// Malformed inputs or options, detected before any solve.
    Configuration,
    /// A solve failed, typically because the model could not be evaluated.
    Evaluation,
    /// A prediction used for reweighting is not strictly positive and finite.
    WeightDomain,
    /// The caller cancelled the fit or its deadline passed.
    Cancelled,
}

/// Unified error type for MUPE estimation.
#[derive(Debug, Clone, PartialEq)]
pub enum MupeError {
    // ---- Start specification ----
    /// No starting parameters were supplied.
    EmptyStart,

    /// A parameter name is empty.
    EmptyName { index: usize },

    /// A parameter name occurs more than once.
    DuplicateName { name: String },

    /// A starting value is NaN/±inf.
    NonFiniteStart { name: String, value: f64 },

    // ---- Observations ----
    /// Response series is empty.
    EmptyObservations,

    /// `y` and `X` disagree on the number of observations.
    LengthMismatch { observations: usize, drivers: usize },

    /// A response or driver value is NaN/±inf.
    NonFiniteData { series: &'static str, index: usize, value: f64 },

    // ---- Options ----
    /// An option is outside its admissible range.
    InvalidOption { option: &'static str, reason: String },

    // ---- Solving ----
    /// The solver (or the model it evaluated) failed.
    Evaluation(OptError),

    /// The solver returned output of the wrong shape.
    SolverOutputMismatch { output: &'static str, expected: usize, found: usize },

    // ---- Reweighting ----
    /// A prediction feeding `1 / prediction` is zero, negative, or non-finite.
    NonPositivePrediction { iteration: usize, index: usize, value: f64 },

    // ---- Cancellation ----
    /// The cancel token was triggered before outer iteration `iteration`.
    Cancelled { iteration: usize },

    /// The deadline passed before outer iteration `iteration`.
    TimedOut { iteration: usize },
}

impl MupeError {
    /// Classify the error.
    pub fn kind(&self) -> MupeErrorKind {
        match self {
            MupeError::EmptyStart
            | MupeError::EmptyName { .. }
            | MupeError::DuplicateName { .. }
            | MupeError::NonFiniteStart { .. }
            | MupeError::EmptyObservations
            | MupeError::LengthMismatch { .. }
            | MupeError::NonFiniteData { .. }
            | MupeError::InvalidOption { .. } => MupeErrorKind::Configuration,
            MupeError::Evaluation(_) | MupeError::SolverOutputMismatch { .. } => {
                MupeErrorKind::Evaluation
            }
            MupeError::NonPositivePrediction { .. } => MupeErrorKind::WeightDomain,
            MupeError::Cancelled { .. } | MupeError::TimedOut { .. } => MupeErrorKind::Cancelled,
        }
    }
}

impl std::error::Error for MupeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MupeError::Evaluation(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for MupeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Start specification ----
            MupeError::EmptyStart => {
                write!(f, "Start specification is empty; at least one parameter is required.")
            }
            MupeError::EmptyName { index } => {
                write!(f, "Parameter name at position {index} is empty.")
            }
            MupeError::DuplicateName { name } => {
                write!(f, "Parameter name '{name}' appears more than once in start.")
            }
            MupeError::NonFiniteStart { name, value } => {
                write!(f, "Starting value for '{name}' must be finite; got: {value}")
            }
            // ---- Observations ----
            MupeError::EmptyObservations => {
                write!(f, "Response series is empty.")
            }
            MupeError::LengthMismatch { observations, drivers } => {
                write!(
                    f,
                    "Length mismatch: y has {observations} observations but X has {drivers} rows."
                )
            }
            MupeError::NonFiniteData { series, index, value } => {
                write!(f, "{series} value at index {index} is non-finite: {value}")
            }
            // ---- Options ----
            MupeError::InvalidOption { option, reason } => {
                write!(f, "Invalid option '{option}': {reason}")
            }
            // ---- Solving ----
            MupeError::Evaluation(err) => {
                write!(f, "Solver evaluation failed: {err}")
            }
            MupeError::SolverOutputMismatch { output, expected, found } => {
                write!(f, "Solver returned {output} of length {found}; expected {expected}.")
            }
            // ---- Reweighting ----
            MupeError::NonPositivePrediction { iteration, index, value } => {
                write!(
                    f,
                    "Non-positive prediction at iteration {iteration}, observation {index}: {value}; \
                     reciprocal weight is undefined."
                )
            }
            // ---- Cancellation ----
            MupeError::Cancelled { iteration } => {
                write!(f, "Fit cancelled before iteration {iteration}.")
            }
            MupeError::TimedOut { iteration } => {
                write!(f, "Fit timed out before iteration {iteration}.")
            }
        }
    }
}

impl From<OptError> for MupeError {
    fn from(err: OptError) -> MupeError {
        MupeError::Evaluation(err)
    }
}

/// Convert a [`MupeError`] into a Python exception.
///
/// Configuration and weight-domain errors become `ValueError`; evaluation
/// failures and cancellation become `RuntimeError`.
#[cfg(feature = "python-bindings")]
impl From<MupeError> for pyo3::PyErr {
    fn from(err: MupeError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyRuntimeError, PyValueError};
        match err.kind() {
            MupeErrorKind::Configuration | MupeErrorKind::WeightDomain => {
                PyValueError::new_err(err.to_string())
            }
            MupeErrorKind::Evaluation | MupeErrorKind::Cancelled => {
                PyRuntimeError::new_err(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Solver errors are wrapped as evaluation errors without alteration.
    fn opt_error_converts_to_evaluation() {
        let inner = OptError::ModelEvaluation { text: "overflow".to_string() };

        let err: MupeError = inner.clone().into();

        assert_eq!(err, MupeError::Evaluation(inner));
        assert_eq!(err.kind(), MupeErrorKind::Evaluation);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    // Purpose
    // -------
    // Each variant family maps to its taxonomy class.
    fn kinds_follow_taxonomy() {
        assert_eq!(
            MupeError::DuplicateName { name: "a".to_string() }.kind(),
            MupeErrorKind::Configuration
        );
        assert_eq!(
            MupeError::LengthMismatch { observations: 3, drivers: 2 }.kind(),
            MupeErrorKind::Configuration
        );
        assert_eq!(
            MupeError::NonPositivePrediction { iteration: 0, index: 1, value: -0.5 }.kind(),
            MupeErrorKind::WeightDomain
        );
        assert_eq!(MupeError::TimedOut { iteration: 4 }.kind(), MupeErrorKind::Cancelled);
    }

    #[test]
    // Purpose
    // -------
    // Messages carry the offending location.
    fn display_mentions_iteration_and_index() {
        let msg = MupeError::NonPositivePrediction { iteration: 2, index: 7, value: 0.0 }.to_string();

        assert!(msg.contains("iteration 2"));
        assert!(msg.contains("observation 7"));
    }
}
