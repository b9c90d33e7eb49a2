//! Tree operation errors
//!
//! Returned by the checked mutators (`try_add_child` and friends). The plain
//! mutators treat every one of these as a caller bug and panic.

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Tree operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Node is already attached somewhere
    #[error("node already has a parent")]
    AlreadyParented,
    /// Node (or reference sibling) is not a child of this parent
    #[error("node is not a child of this parent")]
    NotAChild,
    /// Inserting would make a node its own ancestor
    #[error("node cannot be inserted into itself or its own descendant")]
    Cycle,
    /// Node was created by another document
    #[error("node belongs to a different document")]
    ForeignDocument,
    /// Document nodes can only be roots
    #[error("document nodes cannot become children")]
    DocumentNode,
    /// Child used as its own reference sibling
    #[error("child cannot be positioned relative to itself")]
    SameNode,
}
