//! Call context and provider traits
//!
//! A [`CallContext`] travels with every lifecycle operation. It carries a
//! deadline and a [`CancelToken`]; resources pass it to every remote call
//! and stop as soon as it reports an interruption.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::resource::Operation;

/// Shared cancellation flag
///
/// Clones observe the same flag, so a signal handler can hold one clone
/// while workers hold others.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a call context stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "context cancelled"),
            Self::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

/// Deadline and cancellation for one lifecycle call
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancelToken,
}

impl CallContext {
    /// A context with no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancel: CancelToken::new(),
        }
    }

    /// Share an existing cancellation token
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Derive a child context whose deadline is at most `timeout` from now
    ///
    /// The child shares this context's cancellation token.
    #[must_use]
    pub fn child(&self, timeout: Duration) -> Self {
        let candidate = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, candidate) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            deadline,
            cancel: self.cancel.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Time left before the deadline; `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The current interruption, if any
    pub fn interrupted(&self) -> Option<Interrupt> {
        if self.cancel.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Some(Interrupt::DeadlineExceeded),
            _ => None,
        }
    }

    /// Fail with [`Error::Cancelled`] if the context is no longer live
    pub fn check(&self, resource: &'static str, operation: Operation) -> Result<()> {
        match self.interrupted() {
            Some(interrupt) => Err(Error::Cancelled {
                resource,
                operation,
                reason: interrupt.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_is_live() {
        let ctx = CallContext::new();
        assert!(ctx.remaining().is_none());
        assert!(ctx.check("Team", Operation::Read).is_ok());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = CallContext::new();
        let clone = ctx.clone();
        ctx.cancel_token().cancel();

        assert_eq!(clone.interrupted(), Some(Interrupt::Cancelled));
        let err = clone.check("Team", Operation::Create).unwrap_err();
        assert_eq!(err.to_string(), "Team create cancelled: context cancelled");
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = CallContext::with_timeout(Duration::ZERO);
        assert_eq!(ctx.interrupted(), Some(Interrupt::DeadlineExceeded));
    }

    #[test]
    fn test_child_keeps_earlier_deadline() {
        let parent = CallContext::with_timeout(Duration::from_secs(5));
        let child = parent.child(Duration::from_secs(600));
        assert_eq!(child.deadline(), parent.deadline());

        let tighter = parent.child(Duration::from_millis(10));
        assert!(tighter.deadline() < parent.deadline());
    }

    #[test]
    fn test_child_shares_cancellation() {
        let parent = CallContext::new();
        let child = parent.child(Duration::from_secs(1));
        parent.cancel_token().cancel();
        assert_eq!(child.interrupted(), Some(Interrupt::Cancelled));
    }
}
