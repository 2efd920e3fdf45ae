//! One-shot, multi-waiter promises.
//!
//! A promise is either awaiting with a list of listeners or resolved with
//! a value, and the transition is terminal. Listeners fire in registration
//! order, synchronously inside `resolve`. Awaiting an already-resolved
//! promise returns the value without touching the host.

use crate::engine::{await_with, ResumeHandle};
use crate::error::AlreadyResolved;
use crate::{Cx, Try};
use std::cell::RefCell;
use std::rc::Rc;

enum PromiseState<T> {
    Awaiting(Vec<Box<dyn FnOnce(T)>>),
    Resolved(T),
}

/// A one-shot value that any number of strands can await.
pub struct Promise<T> {
    inner: Rc<RefCell<PromiseState<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Creates a new unresolved promise.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseState::Awaiting(Vec::new()))),
        }
    }

    /// Returns the value if the promise is resolved.
    #[must_use]
    pub fn try_await(&self) -> Option<T> {
        match &*self.inner.borrow() {
            PromiseState::Resolved(value) => Some(value.clone()),
            PromiseState::Awaiting(_) => None,
        }
    }

    /// Returns true if the promise is resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(&*self.inner.borrow(), PromiseState::Resolved(_))
    }

    /// Resolves the promise, firing every listener in registration order.
    ///
    /// Fails if the promise already holds a value.
    pub fn resolve(&self, value: T) -> Result<(), AlreadyResolved> {
        let listeners = {
            let mut state = self.inner.borrow_mut();
            if matches!(&*state, PromiseState::Resolved(_)) {
                return Err(AlreadyResolved);
            }
            match std::mem::replace(&mut *state, PromiseState::Resolved(value.clone())) {
                PromiseState::Awaiting(listeners) => listeners,
                PromiseState::Resolved(_) => Vec::new(),
            }
        };
        tracing::trace!(listeners = listeners.len(), "promise resolved");
        for listener in listeners {
            listener(value.clone());
        }
        Ok(())
    }

    /// Waits for the value.
    ///
    /// If the promise is already resolved this returns immediately without
    /// registering anything with the host.
    pub async fn await_value(&self, cx: &Cx) -> Try<T> {
        if let Some(value) = self.try_await() {
            return Ok(value);
        }
        let inner = self.inner.clone();
        await_with(cx, move |on: ResumeHandle<T>| {
            let mut state = inner.borrow_mut();
            match &mut *state {
                PromiseState::Resolved(value) => {
                    let value = value.clone();
                    drop(state);
                    on.resolve(value);
                }
                PromiseState::Awaiting(listeners) => {
                    listeners.push(Box::new(move |value| on.resolve(value)));
                }
            }
            Ok(None)
        })
        .await
    }
}

impl<T: Clone + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.inner.borrow() {
            PromiseState::Awaiting(listeners) => format!("awaiting({})", listeners.len()),
            PromiseState::Resolved(_) => "resolved".to_string(),
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}
