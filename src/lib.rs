//! An arena-backed hierarchical tree container.
//!
//! A [`Tree`] owns at most one root node. Every node holds a value, an ordered
//! list of children and a non-owning link to its parent. Nodes are named by
//! [`NodeIndex`] handles which stay valid until the node (or one of its
//! ancestors) is erased.
//!
//! ```
//! # use arbor::Tree;
//! let mut tree = Tree::with_root("R");
//! let root = tree.root().unwrap();
//! let a = tree.push(root, "A").unwrap();
//! tree.push(root, "B").unwrap();
//! tree.push(a, "C").unwrap();
//!
//! assert!(tree.iter().copied().eq(["R", "A", "C", "B"]));
//! ```
//!
//! # Storage
//!
//! Nodes live in a slab arena. Children form an intrusive doubly linked list
//! so that insertion and removal at any sibling position is constant time.
//! Erased slots are reused; every slot carries a generation counter so that a
//! handle to an erased node is rejected rather than aliasing a newer node.
//!
//! # Handle validity
//!
//! Inserting never invalidates handles. Erasing a node invalidates the handles
//! of its subtree and nothing else. [`Tree::compact`] renumbers all nodes and
//! returns the map from old to new handles.
pub mod algorithm;
pub mod display;
pub mod error;
pub mod iter;
pub mod memory;
pub mod tree;

#[cfg(test)]
mod tree_test;

pub use error::TreeError;
pub use tree::{NodeMap, Tree};

use memory::EntityIndex;

/// Handle of a node within a [`Tree`].
///
/// Consists of an arena slot and the generation of the slot's occupant. The
/// handle is only meaningful for the tree that returned it (or a clone of that
/// tree, which preserves the slot layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex {
    slot: u32,
    generation: u32,
}

impl EntityIndex for NodeIndex {
    #[inline(always)]
    fn try_new(index: usize, generation: u32) -> Option<Self> {
        let slot = u32::try_from(index).ok()?;
        Some(Self { slot, generation })
    }

    #[inline(always)]
    fn index(self) -> usize {
        self.slot as usize
    }

    #[inline(always)]
    fn generation(self) -> u32 {
        self.generation
    }
}
