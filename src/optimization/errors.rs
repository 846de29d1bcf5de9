//! Unified error surface for the least-squares solver layer.
//!
//! Every fallible routine under `optimization` returns [`OptResult<T>`].
//! Backend (`argmin`) errors are normalized into [`OptError`] on the way out,
//! and errors raised by user model functions travel through the backend
//! unchanged: they are boxed into `argmin::core::Error` inside the solver and
//! recovered by downcasting in the `From` conversion below.
use argmin::core::{ArgminError, Error};

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Jacobian ----
    /// Implies that finite differences should be used.
    JacobianNotImplemented,

    /// Jacobian shape does not match `(n_obs, n_params)`.
    JacobianDimMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Jacobian entries need to be finite.
    InvalidJacobian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- LMOptions ----
    /// Relative cost-reduction tolerance needs to be non-negative and finite.
    InvalidFTol {
        tol: f64,
        reason: &'static str,
    },
    /// Relative step tolerance needs to be non-negative and finite.
    InvalidXTol {
        tol: f64,
        reason: &'static str,
    },
    /// Gradient tolerance needs to be non-negative and finite.
    InvalidGTol {
        tol: f64,
        reason: &'static str,
    },
    /// Evaluation budget must cover the initial residual and Jacobian.
    InvalidMaxNfev {
        max_nfev: usize,
        reason: &'static str,
    },
    /// Invalid finite-difference scheme name.
    InvalidDiffScheme {
        name: String,
        reason: &'static str,
    },

    // ---- Problem data ----
    /// No observations were supplied.
    EmptyData,
    /// Response and weight vectors must have the same length.
    DataLengthMismatch {
        observations: usize,
        weights: usize,
    },
    /// The initial parameter vector is empty.
    EmptyTheta,
    /// Initial parameters need to be finite.
    NonFiniteTheta {
        index: usize,
        value: f64,
    },

    // ---- Model evaluation ----
    /// Model returned a prediction vector of the wrong length.
    PredictionLengthMismatch {
        expected: usize,
        found: usize,
    },
    /// Model function reported a failure for the proposed parameters.
    ModelEvaluation {
        text: String,
    },
    /// Model asked for a parameter name that is not part of the fit.
    UnknownParameter {
        name: String,
    },

    /// The evaluation budget of the current solve is spent.
    BudgetExhausted {
        max_nfev: usize,
    },

    // ---- Cost function ----
    /// Residual sum of squares is not finite.
    NonFiniteCost {
        value: f64,
    },

    // ---- Optimizer outcome ----
    /// Estimated parameters must be finite.
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Theta hat is missing
    MissingThetaHat,

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Jacobian ----
            OptError::JacobianNotImplemented => {
                write!(f, "Analytic Jacobian not implemented")
            }
            OptError::JacobianDimMismatch { expected, found } => {
                write!(f, "Jacobian dimension mismatch: expected {expected:?}, found {found:?}")
            }
            OptError::InvalidJacobian { row, col, value } => {
                write!(f, "Invalid Jacobian at ({row}, {col}): {value}, must be finite")
            }

            // ---- LMOptions ----
            OptError::InvalidFTol { tol, reason } => {
                write!(f, "Invalid cost reduction tolerance {tol}: {reason}")
            }
            OptError::InvalidXTol { tol, reason } => {
                write!(f, "Invalid step tolerance {tol}: {reason}")
            }
            OptError::InvalidGTol { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxNfev { max_nfev, reason } => {
                write!(f, "Invalid evaluation budget {max_nfev}: {reason}")
            }
            OptError::InvalidDiffScheme { name, reason } => {
                write!(f, "Invalid finite-difference scheme '{name}': {reason}")
            }

            // ---- Problem data ----
            OptError::EmptyData => write!(f, "No observations supplied"),
            OptError::DataLengthMismatch { observations, weights } => {
                write!(f, "Length mismatch: {observations} observations but {weights} weights")
            }
            OptError::EmptyTheta => write!(f, "Initial parameter vector is empty"),
            OptError::NonFiniteTheta { index, value } => {
                write!(f, "Initial parameter at index {index} is not finite: {value}")
            }

            // ---- Model evaluation ----
            OptError::PredictionLengthMismatch { expected, found } => {
                write!(f, "Model returned {found} predictions, expected {expected}")
            }
            OptError::ModelEvaluation { text } => {
                write!(f, "Model evaluation failed: {text}")
            }
            OptError::UnknownParameter { name } => {
                write!(f, "Unknown parameter '{name}'")
            }

            OptError::BudgetExhausted { max_nfev } => {
                write!(f, "Evaluation budget of {max_nfev} model calls exhausted")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }

            // ---- Optimizer outcome ----
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => {
                write!(f, "Missing estimated parameters (theta hat)")
            }

            // ---- Argmin ----
            OptError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            OptError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            OptError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            OptError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            OptError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            OptError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            OptError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Fallback ----
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Model failures are boxed into argmin errors on the way in.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(opt_err) => match opt_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<OptError> for pyo3::PyErr {
    fn from(err: OptError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
