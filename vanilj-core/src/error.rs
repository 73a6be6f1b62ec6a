//! Error Types
//!
//! The reactive core has exactly one fatal-by-default condition: writing to
//! a read-only signal. Everything else that can fail comes from the host
//! node tree and is reported with the same names the DOM uses for it.

use thiserror::Error;

/// Errors raised by the reactive primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A write was attempted through a read-only signal handle.
    #[error("cannot assign to readonly signal")]
    InvalidMutation,
}

/// Errors raised by the host node tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// A tag or attribute name is empty or contains characters that are
    /// not allowed in a name.
    #[error("invalid name `{0}`")]
    InvalidCharacter(String),

    /// The insertion would put a node inside itself or one of its
    /// descendants, or put it under a node that cannot have children.
    #[error("node cannot be inserted at the requested position")]
    HierarchyRequest,

    /// The reference node is not a child of the node being modified.
    #[error("reference node is not a child of this node")]
    NotFound,

    /// The operation only applies to another kind of node.
    #[error("`{operation}` is not supported on {node_type:?} nodes")]
    InvalidNodeType {
        operation: &'static str,
        node_type: crate::dom::NodeType,
    },
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Reactive(#[from] ReactiveError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
