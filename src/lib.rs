//! Plait: a structured single-threaded async runtime with scoped cancellation.
//!
//! # Overview
//!
//! Plait multiplexes cooperative *strands* over one event loop of timers and
//! host callbacks. Its defining feature is scoped, composable cancellation:
//! every suspended operation is tagged with a hierarchical [`Scope`], and
//! leaving the dynamic extent of a [`cancelable`] block cancels every
//! operation still registered under it. `timeout` and `first_of` are derived
//! from that, not primitive.
//!
//! # Core Guarantees
//!
//! - **One-shot resumption**: a suspended operation is resumed at most once,
//!   even when the host fires its callback again after completion
//! - **Cancel is a value**: cancellation arrives as a classified outcome, not
//!   a silent drop; cleanups run exactly once
//! - **Order is pinned down**: promise listeners fire in registration order,
//!   channels are FIFO for both values and waiters, strands start
//!   left-to-right, and equal timer deadlines fire in arm order
//! - **No ambient authority**: every effect flows through an explicit [`Cx`]
//!
//! # Module Structure
//!
//! - [`types`]: scope paths, identifiers, logical time, cancel reasons
//! - [`error`]: the tagged outcome (`Try`/`Exn`) and its dominance rules
//! - [`host`]: the timer/event-loop bridge the runtime sits on
//! - [`cx`]: capability context and the callback registry
//! - [`engine`]: the await engine (suspension, adapters, detached callbacks)
//! - [`promise`]: one-shot, multi-waiter values
//! - [`channel`]: unbounded FIFO channels with synchronous hand-off
//! - [`strand`]: N-way interleaving of strands over the single loop
//! - [`combinator`]: `cancelable`, `timeout`, `first_of`
//! - [`time`]: `wait` and `yield_now`
//! - [`driver`]: the outer driver that owns the loop and runs a root strand
//!
//! # Example
//!
//! ```
//! use plait::{strand, Driver};
//!
//! let mut driver = Driver::deterministic();
//! let out = driver.block_on(|cx| async move {
//!     let ch = cx.channel::<u32>();
//!     plait::interleaved2(
//!         &cx,
//!         strand({
//!             let ch = ch.clone();
//!             let cx = cx.clone();
//!             async move { ch.receive(&cx).await }
//!         }),
//!         strand(async move {
//!             ch.emit(7);
//!             Ok(())
//!         }),
//!     )
//!     .await
//! });
//! assert_eq!(out.unwrap().0, 7);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::module_inception)]
#![allow(clippy::cast_possible_truncation)]

pub mod channel;
pub mod combinator;
pub mod cx;
pub mod driver;
pub mod engine;
pub mod error;
pub mod host;
pub mod promise;
pub mod strand;
pub mod test_utils;
pub mod time;
pub mod types;

pub use channel::{await_to_channel, Channel};
pub use combinator::{cancelable, first_of, timeout};
pub use cx::Cx;
pub use driver::Driver;
pub use engine::{
    await0, await1, await_exn0, await_exn1, await_with, no_await, AwaitFuture, Cleanup,
    ResumeHandle,
};
pub use error::{dominant_exn, AlreadyResolved, Exn, ExnKind, Try};
pub use promise::Promise;
pub use strand::{interleaved, interleaved2, interleavedx, strand, Strand};
pub use time::{wait, yield_now};
pub use types::{CancelKind, CancelReason, ChannelId, FrameId, Scope, Time, TimerId};
