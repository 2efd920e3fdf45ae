//! Timer-backed suspension.
//!
//! `wait` arms a host timer and suspends; cancelling it clears the timer.
//! `yield_now` is a zero-delay wait, which parks the strand until the next
//! tick of the loop.

use crate::engine::{await_with, Cleanup, ResumeHandle};
use crate::{Cx, Try};
use std::time::Duration;

/// Suspends for at least `duration`.
///
/// The delay is rounded down to whole milliseconds; anything under one
/// millisecond (including zero) means next tick. If the wait is cancelled
/// the underlying timer is cleared.
pub async fn wait(cx: &Cx, duration: Duration) -> Try<()> {
    let core = cx.core().clone();
    await_with(cx, move |on: ResumeHandle<()>| {
        let delay_ms = duration.as_millis() as u64;
        let timer = {
            let on = on.clone();
            core.host
                .borrow_mut()
                .set_timeout(delay_ms, Box::new(move || on.resolve(())))
        };
        Ok(Some(Box::new(move || {
            core.host.borrow_mut().clear_timeout(timer);
        }) as Cleanup))
    })
    .await
}

/// Parks the strand until the next tick of the loop.
pub async fn yield_now(cx: &Cx) -> Try<()> {
    wait(cx, Duration::ZERO).await
}
