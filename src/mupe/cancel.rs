//! Cooperative cancellation for long-running fits.
//!
//! A [`CancelToken`] is a shared flag plus an optional deadline. The IRLS
//! driver polls it at the top of every outer iteration, the only point where
//! no solve is in flight. Clones share the flag, so one handle can be given
//! to another thread and triggered from there.
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::mupe::errors::{IrlsResult, MupeError};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancel_requested: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is never triggered unless [`cancel`](Self::cancel) is
    /// called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self { cancel_requested: Arc::new(AtomicBool::new(false)), deadline: Some(deadline) }
    }

    /// A token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation. Visible to every clone.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::Relaxed)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail if the token was cancelled or its deadline has passed.
    ///
    /// Explicit cancellation takes precedence over expiry.
    ///
    /// # Errors
    /// - [`MupeError::Cancelled`] / [`MupeError::TimedOut`], tagged with the
    ///   outer iteration about to start.
    pub fn check(&self, iteration: usize) -> IrlsResult<()> {
        if self.is_cancelled() {
            return Err(MupeError::Cancelled { iteration });
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(MupeError::TimedOut { iteration }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes() {
        assert_eq!(CancelToken::new().check(0), Ok(()));
    }

    #[test]
    // Purpose
    // -------
    // Cancelling any clone trips every clone.
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let handle = token.clone();

        handle.cancel();

        assert!(token.is_cancelled());
        assert_eq!(token.check(3), Err(MupeError::Cancelled { iteration: 3 }));
    }

    #[test]
    fn expired_deadline_times_out() {
        let token = CancelToken::with_timeout(Duration::ZERO);

        assert_eq!(token.check(1), Err(MupeError::TimedOut { iteration: 1 }));
    }

    #[test]
    fn cancellation_precedes_expiry() {
        let token = CancelToken::with_timeout(Duration::ZERO);
        token.cancel();

        assert_eq!(token.check(0), Err(MupeError::Cancelled { iteration: 0 }));
    }
}
