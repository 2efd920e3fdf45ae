//! The await engine: one-shot suspension over host callbacks.
//!
//! [`await_with`] is the primitive every suspension point is built from.
//! It mints a child scope frame, registers the operation in the callback
//! registry, and hands the host a [`ResumeHandle`]. The handle delivers a
//! result at most once: once the registry entry is gone, later deliveries
//! are ignored. Cancelling the scope runs the operation's cleanup and
//! resumes the suspended strand with a cancellation outcome.
//!
//! [`no_await`] registers the same way but takes an explicit callback
//! instead of suspending; deliveries with `done = false` leave the entry
//! registered so the host may fire again (streaming).

use crate::cx::{Cx, DriverCore, EntryId};
use crate::error::{Exn, Try};
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

/// A cleanup thunk armed at setup time; runs when the operation is
/// cancelled or fails, and never more than once.
pub type Cleanup = Box<dyn FnOnce()>;

/// Where a delivery lands: a suspended future's slot or a detached callback.
trait DeliverySink<T> {
    fn deliver(&self, res: Try<T>, done: bool);
    fn run_cleanup(&self);
    fn set_cleanup(&self, cleanup: Cleanup);
}

/// Slot for a suspended [`AwaitFuture`].
struct SuspendInner<T> {
    result: Option<Try<T>>,
    waker: Option<Waker>,
    cleanup: Option<Cleanup>,
}

impl<T> DeliverySink<T> for RefCell<SuspendInner<T>> {
    fn deliver(&self, res: Try<T>, _done: bool) {
        let mut inner = self.borrow_mut();
        inner.result = Some(res);
        let waker = inner.waker.take();
        drop(inner);
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn run_cleanup(&self) {
        let cleanup = self.borrow_mut().cleanup.take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    fn set_cleanup(&self, cleanup: Cleanup) {
        self.borrow_mut().cleanup = Some(cleanup);
    }
}

/// Slot for a detached [`no_await`] operation.
struct DetachedInner<T> {
    on_event: Option<Box<dyn FnMut(Try<T>, bool)>>,
    cleanup: Option<Cleanup>,
}

impl<T> DeliverySink<T> for RefCell<DetachedInner<T>> {
    fn deliver(&self, res: Try<T>, done: bool) {
        // Take the callback out so it can re-enter the runtime freely; a
        // delivery that arrives while it is out is dropped.
        let on_event = self.borrow_mut().on_event.take();
        if let Some(mut on_event) = on_event {
            on_event(res, done);
            if !done {
                let mut inner = self.borrow_mut();
                if inner.on_event.is_none() {
                    inner.on_event = Some(on_event);
                }
            }
        } else {
            tracing::trace!("reentrant delivery dropped");
        }
    }

    fn run_cleanup(&self) {
        let cleanup = self.borrow_mut().cleanup.take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    fn set_cleanup(&self, cleanup: Cleanup) {
        self.borrow_mut().cleanup = Some(cleanup);
    }
}

/// The host's handle for delivering the outcome of one operation.
///
/// `fire(res, done)` is a no-op once the operation's registry entry is
/// gone, so post-cancel and post-completion deliveries are ignored. With
/// `done = true` the entry is removed first and, if the result is an
/// exception, the cleanup runs best-effort.
pub struct ResumeHandle<T> {
    slot: Rc<dyn DeliverySink<T>>,
    entry: EntryId,
    core: Weak<DriverCore>,
}

impl<T> Clone for ResumeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            entry: self.entry,
            core: self.core.clone(),
        }
    }
}

impl<T> ResumeHandle<T> {
    fn new(slot: Rc<dyn DeliverySink<T>>, entry: EntryId, core: Weak<DriverCore>) -> Self {
        Self { slot, entry, core }
    }

    /// Delivers a result. `done` marks the operation finished; a delivery
    /// with `done = false` leaves it registered for further deliveries
    /// (meaningful only for detached operations).
    pub fn fire(&self, res: Try<T>, done: bool) {
        let Some(core) = self.core.upgrade() else {
            tracing::trace!("delivery after driver teardown dropped");
            return;
        };
        if !core.registry.borrow().contains(self.entry) {
            tracing::trace!("stale delivery ignored");
            return;
        }
        if done {
            core.registry.borrow_mut().remove(self.entry);
            if res.is_err() {
                self.slot.run_cleanup();
            }
        }
        self.slot.deliver(res, done);
    }

    /// Delivers a success and finishes the operation.
    pub fn resolve(&self, value: T) {
        self.fire(Ok(value), true);
    }

    /// Delivers an exception and finishes the operation.
    pub fn reject(&self, exn: Exn) {
        self.fire(Err(exn), true);
    }
}

impl<T> std::fmt::Debug for ResumeHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeHandle").finish_non_exhaustive()
    }
}

/// Registers `slot` under a fresh child frame of `cx` and runs `setup`.
///
/// The registry entry's cancel thunk delivers a cancellation through the
/// normal path, which removes the entry and runs the cleanup exactly once.
fn register<T: 'static>(
    cx: &Cx,
    slot: Rc<dyn DeliverySink<T>>,
    setup: impl FnOnce(ResumeHandle<T>) -> Try<Option<Cleanup>>,
) -> EntryId {
    let core = cx.core();
    let frame = core.mint_frame();
    let cscope = cx.scope().child(frame);
    let entry = {
        let slot = slot.clone();
        let weak = Rc::downgrade(core);
        core.registry.borrow_mut().insert_with(cscope, move |entry| {
            let handle = ResumeHandle::new(slot, entry, weak);
            Box::new(move |reason| handle.fire(Err(Exn::cancelled(reason)), true))
        })
    };
    let handle = ResumeHandle::new(slot.clone(), entry, Rc::downgrade(core));
    match setup(handle.clone()) {
        Ok(Some(cleanup)) => slot.set_cleanup(cleanup),
        Ok(None) => {}
        Err(exn) => handle.fire(Err(exn), true),
    }
    entry
}

enum AwaitState<T, S> {
    Unarmed { setup: Option<S> },
    Armed {
        slot: Rc<RefCell<SuspendInner<T>>>,
        entry: EntryId,
    },
    Done,
}

/// A one-shot suspension: arms the host operation on first poll and
/// completes when its result is delivered.
///
/// Dropping an armed future deregisters it and runs its cleanup, so host
/// resources do not leak through drop-based cancellation.
pub struct AwaitFuture<T, S> {
    cx: Cx,
    state: AwaitState<T, S>,
}

impl<T, S> Unpin for AwaitFuture<T, S> {}

impl<T, S> Future for AwaitFuture<T, S>
where
    T: 'static,
    S: FnOnce(ResumeHandle<T>) -> Try<Option<Cleanup>>,
{
    type Output = Try<T>;

    fn poll(self: Pin<&mut Self>, task: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                AwaitState::Unarmed { setup } => {
                    let setup = setup.take().expect("await setup missing");
                    let slot = Rc::new(RefCell::new(SuspendInner {
                        result: None,
                        waker: None,
                        cleanup: None,
                    }));
                    let entry = register(&this.cx, slot.clone(), setup);
                    this.state = AwaitState::Armed { slot, entry };
                }
                AwaitState::Armed { slot, .. } => {
                    let mut inner = slot.borrow_mut();
                    if let Some(res) = inner.result.take() {
                        drop(inner);
                        this.state = AwaitState::Done;
                        return Poll::Ready(res);
                    }
                    inner.waker = Some(task.waker().clone());
                    return Poll::Pending;
                }
                AwaitState::Done => panic!("await polled after completion"),
            }
        }
    }
}

impl<T, S> Drop for AwaitFuture<T, S> {
    fn drop(&mut self) {
        if let AwaitState::Armed { slot, entry } = &self.state {
            if self.cx.core().registry.borrow_mut().remove(*entry) {
                tracing::trace!("await dropped while armed");
                let cleanup = slot.borrow_mut().cleanup.take();
                if let Some(cleanup) = cleanup {
                    cleanup();
                }
            }
        }
    }
}

/// Suspends until the host delivers a result.
///
/// `setup` receives the resume handle and arms the host operation; it may
/// return a cleanup to run on cancellation. A synchronous `Err` from setup
/// is routed into the callback as an immediate failed delivery.
pub fn await_with<T, S>(cx: &Cx, setup: S) -> AwaitFuture<T, S>
where
    T: 'static,
    S: FnOnce(ResumeHandle<T>) -> Try<Option<Cleanup>>,
{
    AwaitFuture {
        cx: cx.clone(),
        state: AwaitState::Unarmed { setup: Some(setup) },
    }
}

/// Registers a host operation with an explicit continuation instead of
/// suspending; returns immediately.
///
/// `on_event` runs on every delivery. A delivery with `done = false`
/// leaves the operation registered so the host may fire again; `done =
/// true` (or cancellation) finishes it.
pub fn no_await<T, S, F>(cx: &Cx, setup: S, on_event: F)
where
    T: 'static,
    S: FnOnce(ResumeHandle<T>) -> Try<Option<Cleanup>>,
    F: FnMut(Try<T>, bool) + 'static,
{
    let slot = Rc::new(RefCell::new(DetachedInner {
        on_event: Some(Box::new(on_event)),
        cleanup: None,
    }));
    register(cx, slot, setup);
}

/// Suspends on a host callback of no arguments.
pub async fn await0<S>(cx: &Cx, setup: S) -> Try<()>
where
    S: FnOnce(Box<dyn FnOnce()>) -> Try<Option<Cleanup>>,
{
    await_with(cx, move |on: ResumeHandle<()>| {
        setup(Box::new(move || on.resolve(())))
    })
    .await
}

/// Suspends on a host callback of one value.
pub async fn await1<T, S>(cx: &Cx, setup: S) -> Try<T>
where
    T: 'static,
    S: FnOnce(Box<dyn FnOnce(T)>) -> Try<Option<Cleanup>>,
{
    await_with(cx, move |on: ResumeHandle<T>| {
        setup(Box::new(move |value| on.resolve(value)))
    })
    .await
}

/// Suspends on an error-first host callback with no value.
pub async fn await_exn0<S>(cx: &Cx, setup: S) -> Try<()>
where
    S: FnOnce(Box<dyn FnOnce(Option<Exn>)>) -> Try<Option<Cleanup>>,
{
    await_with(cx, move |on: ResumeHandle<()>| {
        setup(Box::new(move |err| match err {
            Some(exn) => on.reject(exn),
            None => on.resolve(()),
        }))
    })
    .await
}

/// Suspends on an error-first host callback carrying a value.
pub async fn await_exn1<T, S>(cx: &Cx, setup: S) -> Try<T>
where
    T: 'static,
    S: FnOnce(Box<dyn FnOnce(Option<Exn>, Option<T>)>) -> Try<Option<Cleanup>>,
{
    await_with(cx, move |on: ResumeHandle<T>| {
        setup(Box::new(move |err, value| match (err, value) {
            (Some(exn), _) => on.reject(exn),
            (None, Some(value)) => on.resolve(value),
            (None, None) => {
                on.reject(Exn::error("callback delivered neither an error nor a value"));
            }
        }))
    })
    .await
}
