//! Timer heap for deadline management.
//!
//! A small min-heap of `(deadline, timer)` pairs. A monotone sequence
//! number breaks ties so that timers armed for the same deadline fire in
//! arm order; zero-delay timers rely on this for their tick ordering.

use crate::types::{Time, TimerId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Eq, PartialEq)]
struct TimerEntry {
    deadline: Time,
    timer: TimerId,
    seq: u64,
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest deadline first).
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A min-heap of timers ordered by deadline, FIFO within a deadline.
#[derive(Debug, Default)]
pub struct TimerHeap {
    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,
}

impl TimerHeap {
    /// Creates a new empty timer heap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries in the heap.
    ///
    /// Cleared timers keep their entry until popped, so this can exceed the
    /// number of live timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if the heap is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Adds a timer with the given deadline.
    pub fn insert(&mut self, timer: TimerId, deadline: Time) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(TimerEntry {
            deadline,
            timer,
            seq,
        });
    }

    /// Returns the earliest deadline, if any.
    #[must_use]
    pub fn peek_deadline(&self) -> Option<Time> {
        self.heap.peek().map(|e| e.deadline)
    }

    /// Returns the earliest entry without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<(TimerId, Time)> {
        self.heap.peek().map(|e| (e.timer, e.deadline))
    }

    /// Pops the earliest entry regardless of its deadline.
    pub fn pop(&mut self) -> Option<TimerId> {
        self.heap.pop().map(|e| e.timer)
    }

    /// Pops the earliest timer if its deadline is `<= now`.
    pub fn pop_expired(&mut self, now: Time) -> Option<TimerId> {
        if self.heap.peek().is_some_and(|e| e.deadline <= now) {
            self.heap.pop().map(|e| e.timer)
        } else {
            None
        }
    }

    /// Clears all timers.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(n: u64) -> TimerId {
        TimerId(n)
    }

    #[test]
    fn empty_heap_has_no_deadline() {
        let heap = TimerHeap::new();
        assert!(heap.is_empty());
        assert_eq!(heap.peek_deadline(), None);
    }

    #[test]
    fn insert_orders_by_deadline() {
        let mut heap = TimerHeap::new();
        heap.insert(timer(1), Time::from_millis(200));
        heap.insert(timer(2), Time::from_millis(100));
        heap.insert(timer(3), Time::from_millis(150));

        assert_eq!(heap.peek_deadline(), Some(Time::from_millis(100)));
        assert_eq!(heap.pop_expired(Time::from_millis(200)), Some(timer(2)));
        assert_eq!(heap.pop_expired(Time::from_millis(200)), Some(timer(3)));
        assert_eq!(heap.pop_expired(Time::from_millis(200)), Some(timer(1)));
        assert_eq!(heap.pop_expired(Time::from_millis(200)), None);
    }

    #[test]
    fn equal_deadlines_fire_in_arm_order() {
        let mut heap = TimerHeap::new();
        heap.insert(timer(10), Time::ZERO);
        heap.insert(timer(11), Time::ZERO);
        heap.insert(timer(12), Time::ZERO);

        assert_eq!(heap.pop_expired(Time::ZERO), Some(timer(10)));
        assert_eq!(heap.pop_expired(Time::ZERO), Some(timer(11)));
        assert_eq!(heap.pop_expired(Time::ZERO), Some(timer(12)));
    }

    #[test]
    fn pop_expired_respects_now() {
        let mut heap = TimerHeap::new();
        heap.insert(timer(1), Time::from_millis(100));
        heap.insert(timer(2), Time::from_millis(200));

        assert_eq!(heap.pop_expired(Time::from_millis(125)), Some(timer(1)));
        assert_eq!(heap.pop_expired(Time::from_millis(125)), None);
        assert_eq!(heap.peek_deadline(), Some(Time::from_millis(200)));
    }
}
