//! Core value types: scope paths, identifiers, logical time, cancel reasons.

pub mod cancel;
pub mod id;
pub mod scope;
pub mod time;

pub use cancel::{CancelKind, CancelReason};
pub use id::{ChannelId, FrameId, TimerId};
pub use scope::Scope;
pub use time::Time;
