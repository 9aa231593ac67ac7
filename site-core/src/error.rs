//! Error types for element tree operations.

use thiserror::Error;

use crate::ElementId;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in registry, tree and resolver operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An element references a type absent from the registry.
    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    /// A viewport name could not be parsed.
    #[error("Unknown viewport: {0}")]
    UnknownViewport(String),

    /// Element not found in the tree.
    #[error("Element not found: {0}")]
    NotFound(ElementId),

    /// The element's component does not support the requested operation.
    #[error("Element {id} of type '{kind}' does not support {capability}")]
    NotCapable {
        /// Element the operation targeted.
        id: ElementId,
        /// Component type of that element.
        kind: String,
        /// The missing capability.
        capability: &'static str,
    },

    /// Child insertion index outside `[0, child_count]`.
    #[error("Index {index} out of range (child count {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current number of children.
        len: usize,
    },

    /// The root element cannot be removed.
    #[error("Cannot remove the root element")]
    CannotRemoveRoot,

    /// An inserted element reuses an id already present in the tree.
    #[error("Duplicate element id: {0}")]
    DuplicateId(ElementId),

    /// A move would place an element inside its own subtree.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// The tree violates a structural invariant.
    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    /// Tree serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Short machine-readable code for this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownComponentType(_) => "unknown_component_type",
            Self::UnknownViewport(_) => "unknown_viewport",
            Self::NotFound(_) => "not_found",
            Self::NotCapable { .. } => "not_capable",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::CannotRemoveRoot => "cannot_remove_root",
            Self::DuplicateId(_) => "duplicate_id",
            Self::InvalidMove(_) => "invalid_move",
            Self::InvalidTree(_) => "invalid_tree",
            Self::Serialization(_) => "serialization",
        }
    }
}
