//! Observing operations on a [`Tree`].
use std::iter;

use bitvec::prelude::*;

use crate::memory::EntityIndex;
use crate::tree::Tree;
use crate::NodeIndex;

impl<T> Tree<T> {
    /// Returns the number of nodes in the subtree of `node`, including `node`.
    ///
    /// Returns `None` for a handle that is not in the tree.
    pub fn subtree_len(&self, node: NodeIndex) -> Option<usize> {
        if !self.contains(node) {
            return None;
        }

        Some(self.descendants(node).count())
    }

    /// Length of the path from the root to `node`.
    ///
    /// The root has depth `0`, its children depth `1`, and so on. Linear in
    /// the depth. Returns `None` for a handle that is not in the tree.
    pub fn depth(&self, node: NodeIndex) -> Option<usize> {
        if !self.contains(node) {
            return None;
        }

        Some(self.ancestors(node).count())
    }

    /// Returns whether `ancestor` is a proper ancestor of `node`.
    ///
    /// A node is not its own ancestor.
    pub fn is_ancestor(&self, ancestor: NodeIndex, node: NodeIndex) -> bool {
        self.contains(ancestor) && self.ancestors(node).any(|other| other == ancestor)
    }

    /// Finds the deepest node that has both `a` and `b` in its subtree.
    ///
    /// ```
    /// # use arbor::Tree;
    /// let mut tree = Tree::with_root(0);
    /// let root = tree.root().unwrap();
    /// let a = tree.push(root, 1).unwrap();
    /// let b = tree.push(a, 2).unwrap();
    /// let c = tree.push(a, 3).unwrap();
    ///
    /// assert_eq!(tree.lowest_common_ancestor(b, c), Some(a));
    /// assert_eq!(tree.lowest_common_ancestor(a, c), Some(a));
    /// ```
    ///
    /// Returns `None` when either handle is not in the tree.
    pub fn lowest_common_ancestor(&self, a: NodeIndex, b: NodeIndex) -> Option<NodeIndex> {
        if !self.contains(a) || !self.contains(b) {
            return None;
        }

        let mut marked = bitvec![0; self.nodes.upper_bound()];

        for node in iter::once(a).chain(self.ancestors(a)) {
            marked.set(node.index(), true);
        }

        iter::once(b)
            .chain(self.ancestors(b))
            .find(|node| marked[node.index()])
    }
}

/// Trees are equal when they have the same shape and equal values at
/// corresponding positions of the pre-order traversal.
impl<T: PartialEq> PartialEq for Tree<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }

        // Pre-order together with the child counts determines the shape.
        self.indices().zip(other.indices()).all(|(a, b)| {
            self.links(a).child_count == other.links(b).child_count && self[a] == other[b]
        })
    }
}

impl<T: Eq> Eq for Tree<T> {}
