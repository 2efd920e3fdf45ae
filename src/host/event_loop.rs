//! The single-threaded event loop backing every suspension.
//!
//! The loop owns the timer heap, a table of armed thunks, and the clock.
//! Arming a timer hands over a thunk to run when the deadline passes;
//! clearing it is idempotent and simply drops the thunk, leaving a stale
//! heap entry that is skipped when popped.

use super::timer::TimerHeap;
use crate::types::{Time, TimerId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A deferred host callback.
pub type Thunk = Box<dyn FnOnce()>;

/// The loop's time source.
#[derive(Debug)]
pub enum Clock {
    /// Virtual time: idle waiting jumps straight to the next deadline.
    Virtual {
        /// The current virtual instant.
        now: Time,
    },
    /// Wall time, measured from driver start; idle waiting sleeps the thread.
    Wall {
        /// The instant the driver started.
        start: Instant,
    },
}

impl Clock {
    /// A virtual clock starting at zero.
    #[must_use]
    pub const fn virtual_start() -> Self {
        Self::Virtual { now: Time::ZERO }
    }

    /// A wall clock starting now.
    #[must_use]
    pub fn wall_start() -> Self {
        Self::Wall {
            start: Instant::now(),
        }
    }

    fn now(&self) -> Time {
        match self {
            Self::Virtual { now } => *now,
            Self::Wall { start } => Time::from_nanos(start.elapsed().as_nanos() as u64),
        }
    }
}

/// The timer and callback loop.
pub struct EventLoop {
    heap: TimerHeap,
    armed: HashMap<TimerId, Thunk>,
    clock: Clock,
    next_timer: u64,
}

impl EventLoop {
    /// Creates a new loop with the given clock.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            heap: TimerHeap::new(),
            armed: HashMap::new(),
            clock,
            next_timer: 0,
        }
    }

    /// Returns the current time.
    #[must_use]
    pub fn now(&self) -> Time {
        self.clock.now()
    }

    /// Schedules `thunk` to run no sooner than `delay_ms` milliseconds from
    /// now. A zero delay means next tick.
    pub fn set_timeout(&mut self, delay_ms: u64, thunk: Thunk) -> TimerId {
        let timer = TimerId(self.next_timer);
        self.next_timer += 1;
        let deadline = self.now() + Duration::from_millis(delay_ms);
        self.heap.insert(timer, deadline);
        self.armed.insert(timer, thunk);
        tracing::trace!(%timer, %deadline, delay_ms, "timer armed");
        timer
    }

    /// Cancels a pending timer. Idempotent; no effect if it already fired.
    pub fn clear_timeout(&mut self, timer: TimerId) {
        if self.armed.remove(&timer).is_some() {
            tracing::trace!(%timer, "timer cleared");
        }
    }

    /// Returns the number of live (armed, unfired, uncleared) timers.
    #[must_use]
    pub fn armed_len(&self) -> usize {
        self.armed.len()
    }

    /// Returns true if any timer is still armed.
    #[must_use]
    pub fn has_armed(&self) -> bool {
        !self.armed.is_empty()
    }

    /// Removes and returns every thunk whose deadline has passed, in
    /// deadline order (FIFO within a deadline). Cleared timers are skipped.
    pub fn take_due(&mut self) -> Vec<Thunk> {
        let now = self.now();
        let mut due = Vec::new();
        while let Some(timer) = self.heap.pop_expired(now) {
            if let Some(thunk) = self.armed.remove(&timer) {
                tracing::trace!(%timer, %now, "timer fired");
                due.push(thunk);
            }
        }
        due
    }

    /// Returns the next live deadline, dropping stale heap entries.
    pub fn next_deadline(&mut self) -> Option<Time> {
        while let Some((timer, deadline)) = self.heap.peek() {
            if self.armed.contains_key(&timer) {
                return Some(deadline);
            }
            let _ = self.heap.pop();
        }
        None
    }

    /// Waits for the next deadline: virtual time jumps to it, wall time
    /// sleeps the thread until it. Returns false when no timer is armed.
    pub fn advance_to_next(&mut self) -> bool {
        let Some(deadline) = self.next_deadline() else {
            return false;
        };
        match &mut self.clock {
            Clock::Virtual { now } => {
                if deadline > *now {
                    tracing::trace!(from = %*now, to = %deadline, "advancing virtual time");
                    *now = deadline;
                }
            }
            Clock::Wall { start } => {
                let now = Time::from_nanos(start.elapsed().as_nanos() as u64);
                let remaining = deadline.duration_since(now);
                if !remaining.is_zero() {
                    std::thread::sleep(remaining);
                }
            }
        }
        true
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("armed", &self.armed.len())
            .field("now", &self.now())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> Thunk) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |n: u32| -> Thunk {
                let log = log.clone();
                Box::new(move || log.borrow_mut().push(n))
            }
        };
        (log, make)
    }

    #[test]
    fn nothing_due_before_deadline() {
        let (log, thunk) = recorder();
        let mut host = EventLoop::new(Clock::virtual_start());
        host.set_timeout(10, thunk(1));

        assert!(host.take_due().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn due_thunks_run_in_deadline_order() {
        let (log, thunk) = recorder();
        let mut host = EventLoop::new(Clock::virtual_start());
        host.set_timeout(20, thunk(2));
        host.set_timeout(10, thunk(1));
        host.set_timeout(20, thunk(3));

        assert!(host.advance_to_next());
        for t in host.take_due() {
            t();
        }
        assert_eq!(*log.borrow(), vec![1]);

        assert!(host.advance_to_next());
        for t in host.take_due() {
            t();
        }
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn zero_delay_is_due_without_advancing() {
        let (log, thunk) = recorder();
        let mut host = EventLoop::new(Clock::virtual_start());
        host.set_timeout(0, thunk(1));
        host.set_timeout(0, thunk(2));

        for t in host.take_due() {
            t();
        }
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let (log, thunk) = recorder();
        let mut host = EventLoop::new(Clock::virtual_start());
        let keep = host.set_timeout(5, thunk(1));
        let gone = host.set_timeout(5, thunk(2));
        host.clear_timeout(gone);
        host.clear_timeout(gone); // idempotent

        assert_eq!(host.armed_len(), 1);
        assert!(host.advance_to_next());
        for t in host.take_due() {
            t();
        }
        assert_eq!(*log.borrow(), vec![1]);
        let _ = keep;
    }

    #[test]
    fn next_deadline_skips_stale_entries() {
        let (_log, thunk) = recorder();
        let mut host = EventLoop::new(Clock::virtual_start());
        let early = host.set_timeout(5, thunk(1));
        host.set_timeout(50, thunk(2));
        host.clear_timeout(early);

        assert_eq!(host.next_deadline(), Some(Time::from_millis(50)));
    }

    #[test]
    fn advance_is_false_when_idle() {
        let mut host = EventLoop::new(Clock::virtual_start());
        assert!(!host.advance_to_next());
        assert!(!host.has_armed());
    }
}
