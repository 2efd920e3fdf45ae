//! Deadline-bounding an action, derived from `first_of`.

use super::first_of;
use crate::time::wait;
use crate::{Cx, Try};
use std::future::Future;
use std::time::Duration;

/// Runs `action` with a deadline.
///
/// Returns `Some(value)` if the action finishes first and `None` if the
/// deadline does; the losing side is cancelled either way, so an expired
/// action's pending operations (timers included) are torn down.
pub async fn timeout<T, F, Fut>(cx: &Cx, limit: Duration, action: F) -> Try<Option<T>>
where
    T: 'static,
    F: FnOnce(Cx) -> Fut + 'static,
    Fut: Future<Output = Try<T>> + 'static,
{
    first_of(
        cx,
        move |cx| async move {
            wait(&cx, limit).await?;
            tracing::debug!(?limit, "timeout expired");
            Ok(None)
        },
        move |cx| async move { action(cx).await.map(Some) },
    )
    .await
}
