//! The capability context.
//!
//! A [`Cx`] is a cheap-clone handle to the driver core plus the scope the
//! holder is running under. Every operation that can suspend, cancel, or
//! touch the host takes one; there is no ambient global state.

use super::registry::Registry;
use crate::channel::Channel;
use crate::host::EventLoop;
use crate::promise::Promise;
use crate::types::{CancelReason, ChannelId, FrameId, Scope};
use crate::{Exn, Try};
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Shared state owned by the driver: the registry, the event loop, and the
/// id counters.
pub(crate) struct DriverCore {
    pub(crate) registry: RefCell<Registry>,
    pub(crate) host: RefCell<EventLoop>,
    next_frame: Cell<u32>,
    next_channel: Cell<u64>,
}

impl DriverCore {
    pub(crate) fn new(host: EventLoop) -> Self {
        Self {
            registry: RefCell::new(Registry::new()),
            host: RefCell::new(host),
            next_frame: Cell::new(0),
            next_channel: Cell::new(0),
        }
    }

    pub(crate) fn mint_frame(&self) -> FrameId {
        let raw = self.next_frame.get();
        self.next_frame.set(raw + 1);
        FrameId(raw)
    }

    pub(crate) fn mint_channel(&self) -> ChannelId {
        let raw = self.next_channel.get();
        self.next_channel.set(raw + 1);
        ChannelId(raw)
    }
}

/// The capability context threaded through every operation.
#[derive(Clone)]
pub struct Cx {
    core: Rc<DriverCore>,
    scope: Scope,
}

impl Cx {
    pub(crate) fn new(core: Rc<DriverCore>, scope: Scope) -> Self {
        Self { core, scope }
    }

    pub(crate) fn core(&self) -> &Rc<DriverCore> {
        &self.core
    }

    /// Returns the scope this context runs under.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns a context one frame deeper, for entering a cancelable block.
    pub(crate) fn child(&self, frame: FrameId) -> Self {
        Self {
            core: self.core.clone(),
            scope: self.scope.child(frame),
        }
    }

    /// Cancels every operation registered under the current scope.
    ///
    /// Each victim's cleanup runs once and its suspended continuation is
    /// resumed with a cancellation outcome. The call itself returns
    /// normally; the caller only observes the cancellation if it later
    /// suspends under the same scope.
    pub fn cancel(&self) {
        let scope = self.scope.clone();
        self.cancel_scope_with(&scope, CancelReason::requested());
    }

    /// Like [`Cx::cancel`] but with an explicit reason.
    pub fn cancel_with(&self, reason: CancelReason) {
        let scope = self.scope.clone();
        self.cancel_scope_with(&scope, reason);
    }

    /// Cancels every operation registered under `scope`.
    pub fn cancel_scope(&self, scope: &Scope) {
        self.cancel_scope_with(scope, CancelReason::requested());
    }

    pub(crate) fn cancel_scope_with(&self, scope: &Scope, reason: CancelReason) {
        let victims = self.core.registry.borrow_mut().take_within(scope);
        if victims.is_empty() {
            return;
        }
        tracing::debug!(%scope, %reason, count = victims.len(), "cancelling scope");
        for cancel in victims {
            cancel(reason.clone());
        }
    }

    /// Runs a synchronous host operation, converting a panic into an
    /// exception value.
    pub fn io<T>(&self, f: impl FnOnce() -> T) -> Try<T> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Ok(value),
            Err(payload) => Err(Exn::panicked(panic_text(&payload))),
        }
    }

    /// Runs a synchronous host operation that must not fail; a panic
    /// propagates.
    pub fn io_infallible<T>(&self, f: impl FnOnce() -> T) -> T {
        f()
    }

    /// Creates a new unresolved promise.
    #[must_use]
    pub fn promise<T: Clone + 'static>(&self) -> Promise<T> {
        Promise::new()
    }

    /// Creates a new empty channel.
    #[must_use]
    pub fn channel<T: 'static>(&self) -> Channel<T> {
        Channel::new(self.core.mint_channel())
    }

    /// Returns the number of outstanding registered callbacks.
    ///
    /// Zero means the runtime is quiescent apart from the running strand.
    #[must_use]
    pub fn outstanding_ops(&self) -> usize {
        self.core.registry.borrow().len()
    }

    /// Returns the number of live armed timers.
    #[must_use]
    pub fn armed_timers(&self) -> usize {
        self.core.host.borrow().armed_len()
    }
}

impl std::fmt::Debug for Cx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cx").field("scope", &self.scope).finish()
    }
}

// Takes `&Box<dyn Any + Send>` rather than `&(dyn Any + Send)`: coercing the
// payload to an unsized trait-object reference across this function boundary
// loses the concrete type for `downcast_ref` on this toolchain.
fn panic_text(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
