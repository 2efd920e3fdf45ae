//! The cancelable block: a dynamic region with its own scope frame.

use crate::types::CancelReason;
use crate::{Cx, Try};
use std::future::Future;

/// Runs `f` under a fresh scope frame and sweeps the frame on exit.
///
/// Every operation registered inside the block is tagged with the frame;
/// calling [`Cx::cancel`] inside cancels them all. On any exit path —
/// normal return, error, or a propagated cancellation — operations still
/// registered under the frame are cancelled, so nothing outlives the
/// block.
pub async fn cancelable<T, F, Fut>(cx: &Cx, f: F) -> Try<T>
where
    F: FnOnce(Cx) -> Fut,
    Fut: Future<Output = Try<T>>,
{
    let frame = cx.core().mint_frame();
    let inner = cx.child(frame);
    let scope = inner.scope().clone();
    tracing::debug!(%scope, "entering cancelable block");
    let out = f(inner).await;
    cx.cancel_scope_with(&scope, CancelReason::scope_exit());
    tracing::debug!(%scope, ok = out.is_ok(), "left cancelable block");
    out
}
