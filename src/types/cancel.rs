//! Cancellation reason types.
//!
//! Cancellation is a first-class outcome, not a silent drop. These types
//! describe why a suspended operation was torn down.

use core::fmt;

/// The kind of cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelKind {
    /// Explicit cancellation requested by user code.
    Requested,
    /// The enclosing cancelable block was exited with this operation still
    /// pending.
    ScopeExit,
    /// Another branch of a race completed first.
    RaceLost,
    /// The driver is tearing down after the root strand finished.
    Shutdown,
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::ScopeExit => write!(f, "scope exit"),
            Self::RaceLost => write!(f, "race lost"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// The reason for a cancellation, including kind and optional context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason {
    /// The kind of cancellation.
    pub kind: CancelKind,
    /// Optional human-readable message (static for determinism).
    pub message: Option<&'static str>,
}

impl CancelReason {
    /// Creates a new cancellation reason with the given kind.
    #[must_use]
    pub const fn new(kind: CancelKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Explicit user cancellation.
    #[must_use]
    pub const fn requested() -> Self {
        Self::new(CancelKind::Requested)
    }

    /// Cancellation caused by leaving a cancelable block.
    #[must_use]
    pub const fn scope_exit() -> Self {
        Self::new(CancelKind::ScopeExit)
    }

    /// Cancellation of a race loser.
    #[must_use]
    pub const fn race_lost() -> Self {
        Self::new(CancelKind::RaceLost)
    }

    /// Cancellation during driver teardown.
    #[must_use]
    pub const fn shutdown() -> Self {
        Self::new(CancelKind::Shutdown)
    }

    /// Attaches a static message.
    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    /// Returns the kind of this cancellation reason.
    #[must_use]
    pub const fn kind(&self) -> CancelKind {
        self.kind
    }
}

impl Default for CancelReason {
    fn default() -> Self {
        Self::requested()
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_message() {
        assert_eq!(CancelReason::scope_exit().to_string(), "scope exit");
        assert_eq!(CancelReason::race_lost().to_string(), "race lost");
    }

    #[test]
    fn display_with_message() {
        let reason = CancelReason::requested().with_message("operator abort");
        assert_eq!(reason.to_string(), "requested: operator abort");
    }

    #[test]
    fn default_is_requested() {
        assert_eq!(CancelReason::default().kind(), CancelKind::Requested);
    }
}
