//! Interleaving: N strands multiplexed over the single event loop.
//!
//! [`interleavedx`] runs every strand cooperatively and returns each
//! outcome in the strand's input position. Strands start left-to-right, so
//! each strand's first synchronous prefix runs before the next strand
//! starts; after the first suspension the host's delivery order decides.
//! A strand finishing with a finalization outcome tears the remaining
//! strands down once; their cancellation outcomes are collected like any
//! other result.
//!
//! The symmetric forms [`interleaved`] and [`interleaved2`] re-throw the
//! dominant exception of the collected outcomes instead of returning them
//! raw.

mod waker;

use crate::error::dominant_exn;
use crate::types::CancelReason;
use crate::{Cx, Exn, Try};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use waker::ResumeQueue;

/// One strand of an interleaving: a boxed future producing an outcome.
pub type Strand<'a, T> = Pin<Box<dyn Future<Output = Try<T>> + 'a>>;

/// Boxes a future as a strand.
pub fn strand<'a, T, F>(fut: F) -> Strand<'a, T>
where
    F: Future<Output = Try<T>> + 'a,
{
    Box::pin(fut)
}

/// The future driving an N-way interleaving. Created by [`interleavedx`].
pub struct Interleave<'a, T> {
    cx: Cx,
    strands: Vec<Option<Strand<'a, T>>>,
    results: Vec<Option<Try<T>>>,
    queue: Arc<ResumeQueue>,
    remaining: usize,
    started: bool,
    finalize_swept: bool,
    finished: bool,
}

impl<T> Unpin for Interleave<'_, T> {}

impl<T> Future for Interleave<'_, T> {
    type Output = Vec<Try<T>>;

    fn poll(self: Pin<&mut Self>, task: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        assert!(!this.finished, "interleave polled after completion");
        if !this.started {
            this.started = true;
            // Strands start left-to-right.
            for index in 0..this.strands.len() {
                this.queue.push(index);
            }
        }
        loop {
            if this.remaining == 0 {
                this.finished = true;
                let results = this
                    .results
                    .iter_mut()
                    .map(|slot| slot.take().expect("strand result missing"))
                    .collect();
                return Poll::Ready(results);
            }
            let Some(index) = this.queue.pop() else {
                this.queue.set_parent(task.waker().clone());
                return Poll::Pending;
            };
            let Some(fut) = this.strands[index].as_mut() else {
                continue;
            };
            let waker = this.queue.waker_for(index);
            let mut strand_task = Context::from_waker(&waker);
            if let Poll::Ready(out) = fut.as_mut().poll(&mut strand_task) {
                this.strands[index] = None;
                this.remaining -= 1;
                tracing::trace!(index, ok = out.is_ok(), remaining = this.remaining, "strand finished");
                if let Err(exn) = &out {
                    if exn.is_finalize() && !this.finalize_swept {
                        this.finalize_swept = true;
                        this.cx
                            .cancel_with(CancelReason::requested().with_message("sibling finalized"));
                    }
                }
                this.results[index] = Some(out);
            }
        }
    }
}

/// Runs every strand to completion, returning each outcome in input order.
pub fn interleavedx<'a, T>(cx: &Cx, strands: Vec<Strand<'a, T>>) -> Interleave<'a, T> {
    let len = strands.len();
    tracing::debug!(strands = len, "interleaving");
    Interleave {
        cx: cx.clone(),
        strands: strands.into_iter().map(Some).collect(),
        results: (0..len).map(|_| None).collect(),
        queue: ResumeQueue::new(len),
        remaining: len,
        started: false,
        finalize_swept: false,
        finished: false,
    }
}

/// Runs every strand and returns their values in input order, or throws
/// the dominant exception of the collected outcomes.
pub async fn interleaved<'a, T>(cx: &Cx, strands: Vec<Strand<'a, T>>) -> Try<Vec<T>> {
    let outcomes = interleavedx(cx, strands).await;
    if let Some(exn) = dominant_exn(&outcomes) {
        return Err(exn.clone());
    }
    let mut values = Vec::with_capacity(outcomes.len());
    for out in outcomes {
        values.push(out?);
    }
    Ok(values)
}

enum Either<A, B> {
    Left(A),
    Right(B),
}

/// Runs two strands of different types, returning both values or throwing
/// the dominant exception.
pub async fn interleaved2<'a, A, B>(
    cx: &Cx,
    left: Strand<'a, A>,
    right: Strand<'a, B>,
) -> Try<(A, B)>
where
    A: 'a,
    B: 'a,
{
    let left: Strand<'a, Either<A, B>> = Box::pin(async move { left.await.map(Either::Left) });
    let right: Strand<'a, Either<A, B>> = Box::pin(async move { right.await.map(Either::Right) });
    let mut outcomes = interleavedx(cx, vec![left, right]).await;
    if let Some(exn) = dominant_exn(&outcomes) {
        return Err(exn.clone());
    }
    let second = outcomes.pop().expect("two strands produce two outcomes");
    let first = outcomes.pop().expect("two strands produce two outcomes");
    match (first, second) {
        (Ok(Either::Left(a)), Ok(Either::Right(b))) => Ok((a, b)),
        _ => Err(Exn::error("interleaved pair produced mismatched outcomes")),
    }
}
