//! Racing two actions: the winner's outcome, the loser cancelled.

use super::cancelable;
use crate::strand::{interleavedx, strand};
use crate::types::CancelReason;
use crate::{Cx, Try};
use std::future::Future;

/// Runs both actions interleaved under a fresh cancelable frame; whichever
/// completes first cancels the other.
///
/// The winner's outcome is returned as-is — including an ordinary error —
/// while the loser's cancellation outcome is suppressed. If both outcomes
/// are cancellations (the surrounding scope was cancelled), the first is
/// propagated.
pub async fn first_of<T, FA, FutA, FB, FutB>(cx: &Cx, left: FA, right: FB) -> Try<T>
where
    T: 'static,
    FA: FnOnce(Cx) -> FutA + 'static,
    FutA: Future<Output = Try<T>> + 'static,
    FB: FnOnce(Cx) -> FutB + 'static,
    FutB: Future<Output = Try<T>> + 'static,
{
    cancelable(cx, move |inner| async move {
        let left_cx = inner.clone();
        let right_cx = inner.clone();
        let outcomes = interleavedx(
            &inner,
            vec![
                strand(async move {
                    let out = left(left_cx.clone()).await;
                    left_cx.cancel_with(CancelReason::race_lost());
                    out
                }),
                strand(async move {
                    let out = right(right_cx.clone()).await;
                    right_cx.cancel_with(CancelReason::race_lost());
                    out
                }),
            ],
        )
        .await;
        let mut outcomes = outcomes.into_iter();
        let first = outcomes.next().expect("race produces two outcomes");
        let second = outcomes.next().expect("race produces two outcomes");
        pick_winner(first, second)
    })
    .await
}

/// Keeps the first non-cancellation outcome; with both cancelled, the
/// first.
fn pick_winner<T>(first: Try<T>, second: Try<T>) -> Try<T> {
    let first_cancelled = matches!(&first, Err(exn) if exn.is_cancel());
    if !first_cancelled {
        return first;
    }
    let second_cancelled = matches!(&second, Err(exn) if exn.is_cancel());
    if !second_cancelled {
        return second;
    }
    first
}
