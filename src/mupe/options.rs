//! MUPE options — configuration for the IRLS outer loop.
//!
//! Purpose
//! -------
//! Collect the knobs of one MUPE fit in a single validated value: the
//! outer-iteration cap, the per-solve evaluation budget, the closeness
//! tolerances of the convergence test, the inner solver options, and the
//! logger that receives per-iteration records.
//!
//! Invariants & assumptions
//! ------------------------
//! - `max_iter ≥ 1`; `max_nfev ≥ 2` (the residuals at the warm start plus
//!   at least one model call towards a Jacobian).
//! - `atol` and `rtol` are finite and non-negative.
//! - `lm` has been validated by its own constructor; its `max_nfev` is
//!   ignored in favor of `max_nfev` here.
//!
//! Conventions
//! -----------
//! - Defaults reproduce the classic routine: 200 outer iterations, 10
//!   evaluations per solve, `atol = 1e-8`, `rtol = 1e-5`, and a logger that
//!   discards every record.
use crate::{
    mupe::errors::{IrlsResult, MupeError},
    optimization::least_squares::{LMOptions, validation::verify_max_nfev},
};
use slog::{Discard, Logger, o};

/// Default cap on outer IRLS iterations.
pub const DEFAULT_MAX_ITER: usize = 200;

/// Default model evaluation budget per inner solve.
pub const DEFAULT_MAX_NFEV: usize = 10;

/// Default absolute tolerance of the convergence test.
pub const DEFAULT_ATOL: f64 = 1e-8;

/// Default relative tolerance of the convergence test.
pub const DEFAULT_RTOL: f64 = 1e-5;

/// MupeOptions — configuration of one MUPE fit.
///
/// Fields
/// ------
/// - `max_iter`: `usize`
///   Maximum number of outer iterations; the reported iteration index never
///   exceeds `max_iter − 1`.
/// - `max_nfev`: `usize`
///   Evaluation budget of every warm-started partial solve.
/// - `atol`, `rtol`: `f64`
///   Componentwise closeness tolerances, `|prior − new| ≤ atol + rtol·|new|`.
/// - `lm`: [`LMOptions`]
///   Tolerances, finite-difference scheme, and damping of the inner solver.
/// - `logger`: [`slog::Logger`]
///   Destination for per-iteration debug records and the final summary.
#[derive(Debug, Clone)]
pub struct MupeOptions {
    pub max_iter: usize,
    pub max_nfev: usize,
    pub atol: f64,
    pub rtol: f64,
    pub lm: LMOptions,
    pub logger: Logger,
}

impl MupeOptions {
    /// Construct validated options with a discarding logger.
    ///
    /// # Errors
    /// - [`MupeError::InvalidOption`] if `max_iter == 0`, `max_nfev < 2`, or
    ///   either tolerance is negative or non-finite.
    pub fn new(
        max_iter: usize, max_nfev: usize, atol: f64, rtol: f64, lm: LMOptions,
    ) -> IrlsResult<Self> {
        let opts = Self { max_iter, max_nfev, atol, rtol, lm, logger: discard_logger() };
        opts.validate()?;
        Ok(opts)
    }

    /// Re-check the invariants; fields are public and may have been edited
    /// after construction.
    ///
    /// # Errors
    /// - Same as [`MupeOptions::new`].
    pub fn validate(&self) -> IrlsResult<()> {
        if self.max_iter == 0 {
            return Err(MupeError::InvalidOption {
                option: "max_iter",
                reason: "at least one outer iteration is required".to_string(),
            });
        }
        verify_max_nfev(self.max_nfev)
            .map_err(|e| MupeError::InvalidOption { option: "max_nfev", reason: e.to_string() })?;
        verify_tolerance("atol", self.atol)?;
        verify_tolerance("rtol", self.rtol)
    }

    /// Replace the logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }
}

impl Default for MupeOptions {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            max_nfev: DEFAULT_MAX_NFEV,
            atol: DEFAULT_ATOL,
            rtol: DEFAULT_RTOL,
            lm: LMOptions::default(),
            logger: discard_logger(),
        }
    }
}

fn discard_logger() -> Logger {
    Logger::root(Discard, o!())
}

/// Asynchronous terminal logger (stderr) for interactive runs.
#[cfg(feature = "obs_slog")]
pub fn terminal_logger() -> Logger {
    use slog::Drain;
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

fn verify_tolerance(option: &'static str, tol: f64) -> IrlsResult<()> {
    if !tol.is_finite() || tol < 0.0 {
        return Err(MupeError::InvalidOption {
            option,
            reason: format!("must be finite and non-negative, got {tol}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Defaults match the documented constants.
    fn default_matches_constants() {
        let opts = MupeOptions::default();

        assert_eq!(opts.max_iter, 200);
        assert_eq!(opts.max_nfev, 10);
        assert_eq!(opts.atol, 1e-8);
        assert_eq!(opts.rtol, 1e-5);
        assert_eq!(opts.lm, LMOptions::default());
    }

    #[test]
    // Purpose
    // -------
    // `new` preserves valid inputs and rejects each invalid field.
    fn new_validates_each_field() {
        let ok = MupeOptions::new(50, 4, 0.0, 1e-3, LMOptions::default()).unwrap();
        assert_eq!((ok.max_iter, ok.max_nfev, ok.atol, ok.rtol), (50, 4, 0.0, 1e-3));

        let bad = [
            MupeOptions::new(0, 10, 1e-8, 1e-5, LMOptions::default()),
            MupeOptions::new(200, 1, 1e-8, 1e-5, LMOptions::default()),
            MupeOptions::new(200, 10, -1.0, 1e-5, LMOptions::default()),
            MupeOptions::new(200, 10, 1e-8, f64::NAN, LMOptions::default()),
        ];
        let options: Vec<_> = bad
            .into_iter()
            .map(|r| match r.unwrap_err() {
                MupeError::InvalidOption { option, .. } => option,
                other => panic!("unexpected error: {other}"),
            })
            .collect();
        assert_eq!(options, vec!["max_iter", "max_nfev", "atol", "rtol"]);
    }
}
