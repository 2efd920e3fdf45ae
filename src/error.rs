//! The tagged outcome type and its classification rules.
//!
//! Every failing operation produces an [`Exn`] carrying a kind and optional
//! context. Two classifiers matter to the runtime itself:
//!
//! - `is_cancel`: the outcome was produced by tearing down a scope; race
//!   combinators suppress these once a winner is chosen
//! - `is_finalize`: the outcome represents unwinding rather than a normal
//!   error; it dominates cancellation in collective throws
//!
//! When several strands fail together, [`dominant_exn`] selects the one the
//! caller should see.

use crate::types::CancelReason;
use core::fmt;

/// A failing outcome: `Ok(T)` or an exception value.
pub type Try<T> = Result<T, Exn>;

/// The kind of an exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExnKind {
    /// The operation was cancelled by a scope teardown.
    Cancelled(CancelReason),
    /// The outcome represents finalization (unwinding), not a normal error.
    Finalize,
    /// A promise was resolved a second time.
    PromiseAlreadyResolved,
    /// The driver can make no progress: the root strand is suspended with no
    /// pending timers and no ready callbacks.
    Stalled,
    /// A synchronous host operation panicked; the panic text is the context.
    Panicked,
    /// An ordinary application error; the message is the context.
    Error,
}

/// An exception value carried through [`Try`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exn {
    kind: ExnKind,
    context: Option<String>,
}

impl Exn {
    /// Creates a new exception with the given kind.
    #[must_use]
    pub const fn new(kind: ExnKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Returns the exception kind.
    #[must_use]
    pub const fn kind(&self) -> &ExnKind {
        &self.kind
    }

    /// Returns true if this exception is a cancellation.
    #[must_use]
    pub const fn is_cancel(&self) -> bool {
        matches!(self.kind, ExnKind::Cancelled(_))
    }

    /// Returns true if this exception represents finalization.
    #[must_use]
    pub const fn is_finalize(&self) -> bool {
        matches!(self.kind, ExnKind::Finalize)
    }

    /// Creates a cancellation exception from a structured reason.
    #[must_use]
    pub const fn cancelled(reason: CancelReason) -> Self {
        Self::new(ExnKind::Cancelled(reason))
    }

    /// Creates a finalization exception.
    #[must_use]
    pub const fn finalize() -> Self {
        Self::new(ExnKind::Finalize)
    }

    /// Creates an ordinary error with a message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ExnKind::Error).with_context(message)
    }

    /// Creates a captured-panic exception with the panic text.
    #[must_use]
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(ExnKind::Panicked).with_context(message)
    }

    /// Creates the driver's no-progress exception.
    #[must_use]
    pub const fn stalled() -> Self {
        Self::new(ExnKind::Stalled)
    }

    /// Adds context text to the exception.
    #[must_use]
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Returns the cancellation reason, if this is a cancellation.
    #[must_use]
    pub const fn cancel_reason(&self) -> Option<&CancelReason> {
        match &self.kind {
            ExnKind::Cancelled(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for Exn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExnKind::Cancelled(reason) => write!(f, "cancelled: {reason}")?,
            ExnKind::Finalize => write!(f, "finalize")?,
            ExnKind::PromiseAlreadyResolved => write!(f, "promise already resolved")?,
            ExnKind::Stalled => write!(f, "stalled: no timers and no ready callbacks")?,
            ExnKind::Panicked => write!(f, "panicked")?,
            ExnKind::Error => write!(f, "error")?,
        }
        if let Some(ctx) = &self.context {
            write!(f, ": {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Exn {}

impl From<AlreadyResolved> for Exn {
    fn from(_: AlreadyResolved) -> Self {
        Self::new(ExnKind::PromiseAlreadyResolved)
    }
}

/// Error returned when resolving a promise that already holds a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("promise already resolved")]
pub struct AlreadyResolved;

/// Selects the most significant exception out of a sequence of outcomes.
///
/// The scan keeps the current exception unless the next one is a
/// finalization and the current one is not, or the current one is a
/// cancellation and the next one is not. Ties keep the earlier exception.
/// Returns `None` when no outcome failed.
#[must_use]
pub fn dominant_exn<T>(outcomes: &[Try<T>]) -> Option<&Exn> {
    let mut current: Option<&Exn> = None;
    for outcome in outcomes {
        let Err(next) = outcome else { continue };
        match current {
            None => current = Some(next),
            Some(cur) => {
                if (next.is_finalize() && !cur.is_finalize())
                    || (cur.is_cancel() && !next.is_cancel())
                {
                    current = Some(next);
                }
            }
        }
    }
    current
}
