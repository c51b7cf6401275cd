use thiserror::Error;

use crate::memory::AllocError;
use crate::NodeIndex;

/// Errors raised by fallible [`Tree`](crate::Tree) operations.
///
/// A failed operation leaves the tree exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("the tree is empty")]
    Empty,
    #[error("node {0:?} does not belong to the tree")]
    InvalidNode(NodeIndex),
    #[error("can not insert a sibling after the root node")]
    RelativeToRoot,
    #[error("failed to allocate a node: {0}")]
    Alloc(#[from] AllocError),
}
