//! The host bridge: timers and deferred callbacks.
//!
//! Everything the runtime knows about the outside world goes through this
//! module: schedule a thunk to run no sooner than some delay, cancel a
//! pending timer, and ask what the next deadline is. A zero delay means
//! "next tick". The loop runs in one of two clock modes: wall time for
//! production and virtual time for deterministic tests, where idle waiting
//! jumps straight to the next deadline.

pub mod event_loop;
pub mod timer;

pub use event_loop::{Clock, EventLoop, Thunk};
pub use timer::TimerHeap;
