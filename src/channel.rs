//! Unbounded FIFO channels with synchronous hand-off.
//!
//! A channel is in one of three states: empty, values queued (producers
//! are ahead), or waiters queued (consumers are ahead) — never both.
//! `emit` never blocks: with a waiter parked it hands the value over
//! synchronously, inside the `emit` call. Waiters carry ids so a
//! cancelled receive removes itself from the queue instead of consuming
//! a later emit.

use crate::engine::{await_with, no_await, Cleanup, ResumeHandle};
use crate::types::ChannelId;
use crate::{Cx, Try};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

struct Waiter<T> {
    id: u64,
    deliver: Box<dyn FnOnce(T)>,
}

enum ChannelState<T> {
    Empty,
    Values(VecDeque<T>),
    Waiting(VecDeque<Waiter<T>>),
}

struct ChannelInner<T> {
    id: ChannelId,
    state: ChannelState<T>,
    next_waiter: u64,
}

/// An unbounded FIFO channel.
pub struct Channel<T> {
    inner: Rc<RefCell<ChannelInner<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Channel<T> {
    pub(crate) fn new(id: ChannelId) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChannelInner {
                id,
                state: ChannelState::Empty,
                next_waiter: 0,
            })),
        }
    }

    /// Returns the channel's tracing id.
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.inner.borrow().id
    }

    /// Emits a value. Never blocks.
    ///
    /// If a receiver is parked, the value is handed to it synchronously
    /// inside this call, before any later emit on the channel is processed.
    pub fn emit(&self, value: T) {
        let handoff = {
            let mut ch = self.inner.borrow_mut();
            let id = ch.id;
            let state = std::mem::replace(&mut ch.state, ChannelState::Empty);
            match state {
                ChannelState::Empty => {
                    tracing::trace!(channel = %id, "emit queued (empty)");
                    ch.state = ChannelState::Values(VecDeque::from([value]));
                    None
                }
                ChannelState::Values(mut values) => {
                    tracing::trace!(channel = %id, queued = values.len() + 1, "emit queued");
                    values.push_back(value);
                    ch.state = ChannelState::Values(values);
                    None
                }
                ChannelState::Waiting(mut waiters) => match waiters.pop_front() {
                    Some(waiter) => {
                        tracing::trace!(channel = %id, "emit handed to waiter");
                        if !waiters.is_empty() {
                            ch.state = ChannelState::Waiting(waiters);
                        }
                        Some((waiter, value))
                    }
                    None => {
                        ch.state = ChannelState::Values(VecDeque::from([value]));
                        None
                    }
                },
            }
        };
        if let Some((waiter, value)) = handoff {
            (waiter.deliver)(value);
        }
    }

    /// Pops the oldest queued value, if any.
    pub fn try_receive(&self) -> Option<T> {
        let mut ch = self.inner.borrow_mut();
        let state = std::mem::replace(&mut ch.state, ChannelState::Empty);
        match state {
            ChannelState::Values(mut values) => {
                let value = values.pop_front();
                if !values.is_empty() {
                    ch.state = ChannelState::Values(values);
                }
                value
            }
            state => {
                ch.state = state;
                None
            }
        }
    }

    /// Receives the next value, suspending while the channel is empty.
    ///
    /// Waiters are served in FIFO order. Cancelling a suspended receive
    /// removes its waiter from the queue.
    pub async fn receive(&self, cx: &Cx) -> Try<T> {
        if let Some(value) = self.try_receive() {
            return Ok(value);
        }
        let inner = self.inner.clone();
        let for_cleanup = self.inner.clone();
        await_with(cx, move |on: ResumeHandle<T>| {
            let mut ch = inner.borrow_mut();
            let state = std::mem::replace(&mut ch.state, ChannelState::Empty);
            match state {
                ChannelState::Values(mut values) => {
                    let value = values
                        .pop_front()
                        .expect("values state holds at least one value");
                    if !values.is_empty() {
                        ch.state = ChannelState::Values(values);
                    }
                    drop(ch);
                    on.resolve(value);
                    Ok(None)
                }
                state => {
                    let mut waiters = match state {
                        ChannelState::Waiting(waiters) => waiters,
                        _ => VecDeque::new(),
                    };
                    let waiter_id = ch.next_waiter;
                    ch.next_waiter += 1;
                    waiters.push_back(Waiter {
                        id: waiter_id,
                        deliver: Box::new(move |value| on.resolve(value)),
                    });
                    ch.state = ChannelState::Waiting(waiters);
                    drop(ch);
                    Ok(Some(Box::new(move || {
                        remove_waiter(&for_cleanup, waiter_id);
                    }) as Cleanup))
                }
            }
        })
        .await
    }
}

fn remove_waiter<T>(inner: &Rc<RefCell<ChannelInner<T>>>, waiter_id: u64) {
    let mut ch = inner.borrow_mut();
    let now_empty = if let ChannelState::Waiting(waiters) = &mut ch.state {
        waiters.retain(|w| w.id != waiter_id);
        waiters.is_empty()
    } else {
        false
    };
    if now_empty {
        ch.state = ChannelState::Empty;
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ch = self.inner.borrow();
        let state = match &ch.state {
            ChannelState::Empty => "empty".to_string(),
            ChannelState::Values(values) => format!("values({})", values.len()),
            ChannelState::Waiting(waiters) => format!("waiting({})", waiters.len()),
        };
        f.debug_struct("Channel")
            .field("id", &ch.id)
            .field("state", &state)
            .finish()
    }
}

/// Registers a streaming host operation and routes every delivery into a
/// fresh channel.
///
/// The operation stays registered across `done = false` deliveries, so a
/// host callback that fires repeatedly produces a stream of outcomes; a
/// `done = true` delivery (or cancellation) is the final element.
pub fn await_to_channel<T, S>(cx: &Cx, setup: S) -> Channel<Try<T>>
where
    T: 'static,
    S: FnOnce(ResumeHandle<T>) -> Try<Option<Cleanup>>,
{
    let channel = cx.channel::<Try<T>>();
    let sink = channel.clone();
    no_await(cx, setup, move |res, _done| sink.emit(res));
    channel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Driver;
    use crate::strand::{interleavedx, strand};
    use crate::test_utils::init_test_logging;
    use crate::types::CancelReason;

    #[test]
    fn values_are_fifo() {
        init_test_logging();
        let mut driver = Driver::deterministic();
        let out = driver.block_on(|cx| async move {
            let ch = cx.channel::<u32>();
            ch.emit(1);
            ch.emit(2);
            ch.emit(3);
            let a = ch.receive(&cx).await?;
            let b = ch.receive(&cx).await?;
            let c = ch.receive(&cx).await?;
            Ok(vec![a, b, c])
        });
        assert_eq!(out, Ok(vec![1, 2, 3]));
    }

    #[test]
    fn try_receive_empties_the_queue() {
        init_test_logging();
        let mut driver = Driver::deterministic();
        let out = driver.block_on(|cx| async move {
            let ch = cx.channel::<&'static str>();
            assert_eq!(ch.try_receive(), None);
            ch.emit("a");
            ch.emit("b");
            assert_eq!(ch.try_receive(), Some("a"));
            assert_eq!(ch.try_receive(), Some("b"));
            assert_eq!(ch.try_receive(), None);
            Ok(())
        });
        assert_eq!(out, Ok(()));
    }

    #[test]
    fn channels_have_distinct_ids() {
        init_test_logging();
        let mut driver = Driver::deterministic();
        let out = driver.block_on(|cx| async move {
            let a = cx.channel::<u32>();
            let b = cx.channel::<u32>();
            assert_ne!(a.id(), b.id());
            Ok(())
        });
        assert_eq!(out, Ok(()));
    }

    #[test]
    fn parked_receivers_are_served_in_order() {
        init_test_logging();
        let mut driver = Driver::deterministic();
        let out = driver.block_on(|cx| async move {
            let ch = cx.channel::<u32>();
            let recv = |tag: u32| {
                let ch = ch.clone();
                let cx = cx.clone();
                strand(async move {
                    let v = ch.receive(&cx).await?;
                    Ok((tag, v))
                })
            };
            let emitter = {
                let ch = ch.clone();
                strand(async move {
                    ch.emit(10);
                    ch.emit(20);
                    Ok((0, 0))
                })
            };
            let outs = interleavedx(&cx, vec![recv(1), recv(2), emitter]).await;
            Ok(outs)
        });
        let outs = out.unwrap();
        assert_eq!(outs, vec![Ok((1, 10)), Ok((2, 20)), Ok((0, 0))]);
    }

    #[test]
    fn cancelled_receive_does_not_consume_an_emit() {
        init_test_logging();
        let mut driver = Driver::deterministic();
        let out = driver.block_on(|cx| async move {
            let ch = cx.channel::<u32>();
            let doomed = {
                let ch = ch.clone();
                let cx = cx.clone();
                strand(async move { ch.receive(&cx).await })
            };
            let canceller = {
                let cx = cx.clone();
                strand(async move {
                    cx.cancel_with(CancelReason::requested());
                    Ok(0)
                })
            };
            let outs = interleavedx(&cx, vec![doomed, canceller]).await;
            assert!(outs[0].as_ref().unwrap_err().is_cancel());

            // The waiter queue is clean: this emit is still available.
            ch.emit(5);
            let v = ch.receive(&cx).await?;
            Ok(v)
        });
        assert_eq!(out, Ok(5));
    }

    #[test]
    fn await_to_channel_streams_deliveries() {
        init_test_logging();
        let mut driver = Driver::deterministic();
        let out = driver.block_on(|cx| async move {
            let ch = await_to_channel(&cx, |on: ResumeHandle<u32>| {
                on.fire(Ok(1), false);
                on.fire(Ok(2), false);
                on.fire(Ok(3), true);
                Ok(None)
            });
            let a = ch.receive(&cx).await??;
            let b = ch.receive(&cx).await??;
            let c = ch.receive(&cx).await??;
            assert_eq!(cx.outstanding_ops(), 0);
            Ok(a + b + c)
        });
        assert_eq!(out, Ok(6));
    }
}
