//! Scope paths: hierarchical identifiers for outstanding callbacks.
//!
//! A scope is an immutable, root-first path of frame ids. Every suspended
//! operation is registered under a scope; cancellation targets a scope and
//! hits every registered operation whose scope has the target as a prefix.
//! Scopes are values: equality is structural and clones are O(1).

use super::FrameId;
use core::fmt;
use std::rc::Rc;

/// An immutable path of frame ids, root first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    frames: Rc<[FrameId]>,
}

impl Scope {
    /// Returns the root (global) scope: the empty path.
    #[must_use]
    pub fn root() -> Self {
        Self {
            frames: Rc::from(Vec::new()),
        }
    }

    /// Returns a child scope with `frame` appended.
    #[must_use]
    pub fn child(&self, frame: FrameId) -> Self {
        let mut frames = self.frames.to_vec();
        frames.push(frame);
        Self {
            frames: frames.into(),
        }
    }

    /// Returns true if this is the root scope.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the number of frames in the path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns the frames of the path, root first.
    #[must_use]
    pub fn frames(&self) -> &[FrameId] {
        &self.frames
    }

    /// Returns true if `ancestor` is a prefix of this scope.
    ///
    /// Every scope is within itself and within the root scope.
    #[must_use]
    pub fn is_within(&self, ancestor: &Self) -> bool {
        self.frames.starts_with(&ancestor.frames)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({self})")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return write!(f, "/");
        }
        for frame in self.frames.iter() {
            write!(f, "/{frame}")?;
        }
        Ok(())
    }
}
