//! The driver-owned record of outstanding callbacks.
//!
//! Every suspended or detached operation inserts one entry tagged with its
//! scope. Entries are kept in insertion order; a cancellation sweep walks
//! them in that order and takes each entry's cancel thunk, leaving the
//! entry in place — the delivery it triggers removes the entry through the
//! normal path. An entry whose thunk was already taken is skipped by later
//! sweeps.

use crate::types::{CancelReason, Scope};

/// A cancel thunk: runs the operation's cleanup and delivers a cancel
/// outcome to its pending callback.
pub(crate) type CancelFn = Box<dyn FnOnce(CancelReason)>;

/// A stable handle to one registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EntryId(u64);

struct Entry {
    id: EntryId,
    scope: Scope,
    cancel: Option<CancelFn>,
}

/// Insertion-ordered registry of outstanding callbacks.
#[derive(Default)]
pub(crate) struct Registry {
    entries: Vec<Entry>,
    next_entry: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry; the builder receives the new entry's id so the
    /// cancel thunk can refer to its own entry.
    pub(crate) fn insert_with(
        &mut self,
        scope: Scope,
        build: impl FnOnce(EntryId) -> CancelFn,
    ) -> EntryId {
        let id = EntryId(self.next_entry);
        self.next_entry += 1;
        let cancel = build(id);
        tracing::trace!(entry = id.0, %scope, "registered callback");
        self.entries.push(Entry {
            id,
            scope,
            cancel: Some(cancel),
        });
        id
    }

    /// Removes an entry. Returns false if it was already removed.
    pub(crate) fn remove(&mut self, id: EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        if removed {
            tracing::trace!(entry = id.0, "deregistered callback");
        }
        removed
    }

    /// Returns true if the entry is still registered.
    pub(crate) fn contains(&self, id: EntryId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Takes the cancel thunks of every entry within `scope`, in insertion
    /// order. Entries stay registered; delivery removes them.
    pub(crate) fn take_within(&mut self, scope: &Scope) -> Vec<CancelFn> {
        let mut taken = Vec::new();
        for entry in &mut self.entries {
            if entry.scope.is_within(scope) {
                if let Some(cancel) = entry.cancel.take() {
                    taken.push(cancel);
                }
            }
        }
        if !taken.is_empty() {
            tracing::trace!(%scope, count = taken.len(), "cancel sweep collected");
        }
        taken
    }

    /// Returns the number of outstanding entries.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no callback is outstanding.
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
