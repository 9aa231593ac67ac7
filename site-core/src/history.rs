//! Linear undo/redo history of tree snapshots.

use std::collections::VecDeque;

use crate::ElementTree;

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Undo/redo stacks of whole-tree snapshots.
///
/// Trees are immutable values, so a snapshot is just the tree as it was
/// before a mutation.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<ElementTree>,
    redo: Vec<ElementTree>,
    depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl History {
    /// Create a history keeping at most `depth` undo steps (minimum 1).
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            depth: depth.max(1),
        }
    }

    /// Record the state that preceded a mutation.
    ///
    /// Clears the redo branch; the oldest entry is dropped past the depth limit.
    pub fn record(&mut self, previous: ElementTree) {
        self.redo.clear();
        if self.undo.len() == self.depth {
            self.undo.pop_front();
        }
        self.undo.push_back(previous);
    }

    /// Step back: returns the tree to restore, given the current one.
    pub fn undo(&mut self, current: &ElementTree) -> Option<ElementTree> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current.clone());
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: &ElementTree) -> Option<ElementTree> {
        let next = self.redo.pop()?;
        self.undo.push_back(current.clone());
        Some(next)
    }

    /// Whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo steps held.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
