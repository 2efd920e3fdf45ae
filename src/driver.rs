//! The outer driver: owns the event loop and runs a root strand.
//!
//! `block_on` polls the root future and pumps the loop: run every due
//! callback, otherwise advance to the next timer deadline (virtual time
//! jumps, wall time sleeps), otherwise report a stall. After the root
//! completes, the root scope is swept so detached operations left behind
//! are cancelled rather than leaked.

use crate::cx::{Cx, DriverCore};
use crate::error::Exn;
use crate::host::{Clock, EventLoop};
use crate::types::{CancelReason, Scope};
use crate::Try;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};

/// Wake flag for the root strand.
///
/// Every waker in the runtime bottoms out here: delivering a result wakes
/// the root, which re-polls the future tree.
#[derive(Default)]
struct RootSignal {
    woken: Mutex<bool>,
}

impl RootSignal {
    fn set(&self) {
        *self.woken.lock().expect("lock poisoned") = true;
    }

    fn take(&self) -> bool {
        std::mem::take(&mut *self.woken.lock().expect("lock poisoned"))
    }
}

impl Wake for RootSignal {
    fn wake(self: Arc<Self>) {
        self.set();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.set();
    }
}

/// The single-threaded driver.
pub struct Driver {
    core: Rc<DriverCore>,
}

impl Driver {
    /// Creates a driver on the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::wall_start())
    }

    /// Creates a driver on virtual time: idle waiting jumps straight to the
    /// next deadline, so timer-heavy code runs instantly and
    /// deterministically.
    #[must_use]
    pub fn deterministic() -> Self {
        Self::with_clock(Clock::virtual_start())
    }

    fn with_clock(clock: Clock) -> Self {
        Self {
            core: Rc::new(DriverCore::new(EventLoop::new(clock))),
        }
    }

    /// Runs a root strand to completion.
    ///
    /// Returns the strand's outcome, or a `Stalled` exception if it
    /// suspends with no timer armed and no callback ready.
    pub fn block_on<T, F, Fut>(&mut self, f: F) -> Try<T>
    where
        F: FnOnce(Cx) -> Fut,
        Fut: Future<Output = Try<T>>,
    {
        let cx = Cx::new(self.core.clone(), Scope::root());
        let mut root = pin!(f(cx.clone()));
        let signal = Arc::new(RootSignal::default());
        let waker = Waker::from(signal.clone());
        let mut task = Context::from_waker(&waker);

        signal.set();
        let out = loop {
            if signal.take() {
                if let Poll::Ready(out) = root.as_mut().poll(&mut task) {
                    break out;
                }
                continue;
            }
            let due = self.core.host.borrow_mut().take_due();
            if !due.is_empty() {
                for thunk in due {
                    thunk();
                }
                continue;
            }
            if self.core.host.borrow_mut().advance_to_next() {
                continue;
            }
            tracing::warn!("driver stalled: root suspended with no timers armed");
            break Err(Exn::stalled());
        };

        cx.cancel_scope_with(&Scope::root(), CancelReason::shutdown());
        out
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{await_with, no_await, ResumeHandle};
    use crate::test_utils::init_test_logging;
    use crate::ExnKind;
    use std::cell::Cell;

    #[test]
    fn runs_a_synchronous_root() {
        init_test_logging();
        let mut driver = Driver::deterministic();
        let out = driver.block_on(|_cx| async move { Ok(40 + 2) });
        assert_eq!(out, Ok(42));
    }

    #[test]
    fn reports_a_stall() {
        init_test_logging();
        let mut driver = Driver::deterministic();
        let out: Try<u32> = driver.block_on(|cx| async move {
            // Suspend forever: nothing is armed, nothing will fire.
            await_with(&cx, |_on: ResumeHandle<u32>| Ok(None)).await
        });
        assert_eq!(out.unwrap_err().kind(), &ExnKind::Stalled);
    }

    #[test]
    fn teardown_sweeps_detached_leftovers() {
        init_test_logging();
        let cancelled = Rc::new(Cell::new(false));
        let mut driver = Driver::deterministic();
        let observed = cancelled.clone();
        let out = driver.block_on(move |cx| async move {
            no_await(
                &cx,
                |_on: ResumeHandle<u32>| Ok(None),
                move |res, _done| {
                    if res.is_err() {
                        observed.set(true);
                    }
                },
            );
            Ok(())
        });
        assert_eq!(out, Ok(()));
        assert!(cancelled.get());
    }

    #[test]
    fn wall_clock_driver_runs_timers() {
        init_test_logging();
        let mut driver = Driver::new();
        let out = driver.block_on(|cx| async move {
            crate::time::wait(&cx, std::time::Duration::from_millis(1)).await?;
            Ok("ticked")
        });
        assert_eq!(out, Ok("ticked"));
    }

    #[test]
    fn driver_can_be_reused() {
        init_test_logging();
        let mut driver = Driver::deterministic();
        let first = driver.block_on(|_cx| async move { Ok(1) });
        let second = driver.block_on(|_cx| async move { Ok(2) });
        assert_eq!(first, Ok(1));
        assert_eq!(second, Ok(2));
    }
}
