//! Iterators over the nodes of a [`Tree`].
//!
//! The traversal order of every iterator that visits more than one level is
//! depth-first pre-order with children visited in their list order.
use std::iter::FusedIterator;

use crate::memory::EntityIndex;
use crate::tree::{Links, NodeData, Tree};
use crate::NodeIndex;

/// Pre-order traversal of node handles.
///
/// Created by [`Tree::iter_from`] and [`Tree::descendants`].
#[derive(Debug, Clone)]
pub struct PreOrder<'a, T> {
    tree: &'a Tree<T>,
    next: Option<NodeIndex>,
    /// Node whose subtree bounds the traversal, if any.
    stop: Option<NodeIndex>,
}

impl<'a, T> PreOrder<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, start: NodeIndex, stop: Option<NodeIndex>) -> Self {
        Self {
            tree,
            next: Some(start).filter(|start| tree.contains(*start)),
            stop,
        }
    }
}

impl<'a, T> Iterator for PreOrder<'a, T> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.next_pre_order(current, self.stop);
        Some(current)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(_) => (1, Some(self.tree.len())),
            None => (0, Some(0)),
        }
    }
}

impl<'a, T> FusedIterator for PreOrder<'a, T> {}

/// Node handles of the whole tree in pre-order.
///
/// Created by [`Tree::indices`].
#[derive(Debug, Clone)]
pub struct Indices<'a, T> {
    inner: PreOrder<'a, T>,
    len: usize,
}

impl<'a, T> Indices<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>) -> Self {
        let inner = match tree.root() {
            Some(root) => PreOrder::new(tree, root, None),
            None => PreOrder {
                tree,
                next: None,
                stop: None,
            },
        };

        Self {
            inner,
            len: tree.len(),
        }
    }
}

impl<'a, T> Iterator for Indices<'a, T> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.inner.next()?;
        self.len -= 1;
        Some(node)
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> ExactSizeIterator for Indices<'a, T> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }
}

impl<'a, T> FusedIterator for Indices<'a, T> {}

/// Values of the whole tree in pre-order.
///
/// Created by [`Tree::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a, T> {
    tree: &'a Tree<T>,
    indices: Indices<'a, T>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>) -> Self {
        Self {
            tree,
            indices: Indices::new(tree),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let node = self.indices.next()?;
        Some(&tree[node])
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.indices.len()
    }
}

impl<'a, T> FusedIterator for Iter<'a, T> {}

/// Mutable values of the whole tree in pre-order.
///
/// Created by [`Tree::iter_mut`]. The values are split off the node storage
/// up front, one slot per node, and handed out as the traversal reaches them.
/// Construction allocates two buffers sized to the slot count, including the
/// slots of erased nodes, before the first value is yielded.
#[derive(Debug)]
pub struct IterMut<'a, T> {
    values: Vec<Option<&'a mut T>>,
    links: Vec<Option<&'a Links>>,
    next: Option<NodeIndex>,
    len: usize,
}

impl<'a, T> IterMut<'a, T> {
    pub(crate) fn new(tree: &'a mut Tree<T>) -> Self {
        let next = tree.root;
        let len = tree.len();
        let upper_bound = tree.nodes.upper_bound();

        let mut values = Vec::with_capacity(upper_bound);
        values.resize_with(upper_bound, || None);
        let mut links = vec![None; upper_bound];

        for (node, data) in tree.nodes.iter_mut() {
            let NodeData {
                value,
                links: node_links,
            } = data;
            let node_links: &'a Links = node_links;
            values[node.index()] = Some(value);
            links[node.index()] = Some(node_links);
        }

        Self {
            values,
            links,
            next,
            len,
        }
    }

    fn next_after_subtree(&self, mut node: NodeIndex) -> Option<NodeIndex> {
        loop {
            let links = self.links[node.index()]?;

            if let Some(next) = links.siblings[1] {
                return Some(next);
            }

            node = links.parent?;
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        let value = self.values[node.index()].take()?;
        let links = self.links[node.index()]?;

        self.next = match links.children[0] {
            Some(child) => Some(child),
            None => self.next_after_subtree(node),
        };
        self.len -= 1;

        Some(value)
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }
}

impl<'a, T> FusedIterator for IterMut<'a, T> {}

/// Direct children of a node.
///
/// Created by [`Tree::children`].
#[derive(Debug, Clone)]
pub struct Children<'a, T> {
    tree: &'a Tree<T>,
    next: Option<NodeIndex>,
    prev: Option<NodeIndex>,
    len: usize,
}

impl<'a, T> Children<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, node: NodeIndex) -> Self {
        let links = tree.node_links(node).copied().unwrap_or_default();
        Self {
            tree,
            next: links.children[0],
            prev: links.children[1],
            len: links.child_count as usize,
        }
    }
}

impl<'a, T> Iterator for Children<'a, T> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;
        let current = self.next?;
        self.next = self.tree.links(current).siblings[1];
        Some(current)
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for Children<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;
        let current = self.prev?;
        self.prev = self.tree.links(current).siblings[0];
        Some(current)
    }
}

impl<'a, T> ExactSizeIterator for Children<'a, T> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }
}

impl<'a, T> FusedIterator for Children<'a, T> {}

/// Ancestors of a node, from its parent up to the root.
///
/// Created by [`Tree::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors<'a, T> {
    tree: &'a Tree<T>,
    next: Option<NodeIndex>,
}

impl<'a, T> Ancestors<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, node: NodeIndex) -> Self {
        Self {
            tree,
            next: tree.parent(node),
        }
    }
}

impl<'a, T> Iterator for Ancestors<'a, T> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.links(current).parent;
        Some(current)
    }
}

impl<'a, T> FusedIterator for Ancestors<'a, T> {}
