//! Identifier types for runtime entities.
//!
//! These newtypes keep the three id spaces of the runtime apart: scope
//! frames, channels, and timers. All of them are minted from monotone
//! counters owned by the driver core or the event loop.

use core::fmt;

/// A unique identifier for one frame of a scope path.
///
/// Every `cancelable` block and every suspended operation mints one frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub(crate) u32);

impl FrameId {
    /// Creates a frame id for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.0)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// A unique identifier for a channel, carried for tracing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub(crate) u64);

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// A handle to a pending timer, used to cancel it before it fires.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({})", self.0)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_terse() {
        assert_eq!(FrameId(3).to_string(), "F3");
        assert_eq!(ChannelId(7).to_string(), "C7");
        assert_eq!(TimerId(9).to_string(), "T9");
    }

    #[test]
    fn debug_shows_raw_value() {
        assert_eq!(format!("{:?}", FrameId(3)), "FrameId(3)");
        assert_eq!(format!("{:?}", TimerId(9)), "TimerId(9)");
    }

    #[test]
    fn ids_are_ordered() {
        assert!(FrameId(1) < FrameId(2));
        assert!(TimerId(1) < TimerId(2));
    }
}
