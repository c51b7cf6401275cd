use std::collections::BTreeMap;
use std::mem::replace;
use std::ops::{Index, IndexMut};

use tracing::{debug, trace};

use crate::error::TreeError;
use crate::iter::{Ancestors, Children, Indices, Iter, IterMut, PreOrder};
use crate::memory::Slab;
use crate::NodeIndex;

/// Map of updated node handles after [`Tree::compact`].
pub type NodeMap = BTreeMap<NodeIndex, NodeIndex>;

/// A hierarchical container with a single root and ordered children.
///
/// Cloning a tree deep-copies every node. The clone keeps the slot layout of
/// the original, so handles of the original name the corresponding nodes of
/// the clone, but the two trees share no storage.
#[derive(Debug, Clone)]
pub struct Tree<T> {
    pub(crate) nodes: Slab<NodeIndex, NodeData<T>>,
    pub(crate) root: Option<NodeIndex>,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData<T> {
    pub(crate) value: T,
    pub(crate) links: Links,
}

impl<T> NodeData<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            links: Links::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Links {
    /// The first and last child of the node, if any.
    pub(crate) children: [Option<NodeIndex>; 2],
    /// The number of children.
    pub(crate) child_count: u32,
    /// The parent of the node, if any. Never used for ownership.
    pub(crate) parent: Option<NodeIndex>,
    /// The previous and next sibling of the node, if any.
    pub(crate) siblings: [Option<NodeIndex>; 2],
}

impl Links {
    fn relink(&mut self, node_map: &NodeMap) {
        let remap = |node: Option<NodeIndex>| node.and_then(|node| node_map.get(&node)).copied();

        for i in 0..=1 {
            self.children[i] = remap(self.children[i]);
            self.siblings[i] = remap(self.siblings[i]);
        }

        self.parent = remap(self.parent);
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<T> for Tree<T> {
    fn from(value: T) -> Self {
        Self::with_root(value)
    }
}

impl<T> Tree<T> {
    /// Creates a new empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            root: None,
        }
    }

    /// Creates a new empty tree with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Slab::with_capacity(capacity),
            root: None,
        }
    }

    /// Creates a tree holding a single root node.
    ///
    /// # Panics
    ///
    /// Panics when the root node can not be allocated.
    pub fn with_root(value: T) -> Self {
        let mut nodes = Slab::new();
        let root = nodes.insert(NodeData::new(value));
        Self {
            nodes,
            root: Some(root),
        }
    }

    /// Returns the root node, or `None` if the tree is empty.
    #[inline]
    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    /// Borrows the root value.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Empty`] when the tree has no root.
    pub fn root_value(&self) -> Result<&T, TreeError> {
        let root = self.root.ok_or(TreeError::Empty)?;
        Ok(&self.nodes[root].value)
    }

    /// Mutably borrows the root value.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Empty`] when the tree has no root.
    pub fn root_value_mut(&mut self) -> Result<&mut T, TreeError> {
        let root = self.root.ok_or(TreeError::Empty)?;
        Ok(&mut self.nodes[root].value)
    }

    /// Returns whether `node` names a node of this tree.
    #[inline]
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.nodes.contains(node)
    }

    /// Borrows the value of a node, or `None` for a handle that is not in the tree.
    #[inline]
    pub fn get(&self, node: NodeIndex) -> Option<&T> {
        Some(&self.nodes.get(node)?.value)
    }

    /// Mutably borrows the value of a node, or `None` for a handle that is not in the tree.
    #[inline]
    pub fn get_mut(&mut self, node: NodeIndex) -> Option<&mut T> {
        Some(&mut self.nodes.get_mut(node)?.value)
    }

    /// Returns a node's parent or `None` if it is the root.
    #[inline]
    pub fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node_links(node)?.parent
    }

    /// Returns a node's first child, if any.
    #[inline]
    pub fn first_child(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node_links(node)?.children[0]
    }

    /// Returns a node's last child, if any.
    #[inline]
    pub fn last_child(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node_links(node)?.children[1]
    }

    /// Returns the next sibling of a node, if any.
    #[inline]
    pub fn next_sibling(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node_links(node)?.siblings[1]
    }

    /// Returns the previous sibling of a node, if any.
    #[inline]
    pub fn prev_sibling(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node_links(node)?.siblings[0]
    }

    /// Returns the number of a node's children.
    ///
    /// Returns `0` for a handle that is not in the tree.
    #[inline]
    pub fn child_count(&self, node: NodeIndex) -> usize {
        self.node_links(node).map_or(0, |links| links.child_count as usize)
    }

    /// Whether the tree has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of nodes in the tree.
    ///
    /// The count is maintained on every insertion and removal, so this is
    /// constant time.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the largest number of nodes a tree can hold.
    #[inline]
    pub fn max_size(&self) -> usize {
        Slab::<NodeIndex, NodeData<T>>::MAX_LEN
    }

    /// Returns the number of nodes the tree can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Reserves room for at least `additional` more nodes.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Alloc`] when the memory can not be reserved.
    pub fn reserve(&mut self, additional: usize) -> Result<(), TreeError> {
        Ok(self.nodes.reserve(additional)?)
    }

    /// Shrinks the node storage as much as possible without moving nodes.
    ///
    /// Use [`Tree::compact`] first to release the slots of erased nodes.
    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit()
    }

    /// Inserts a new root node.
    ///
    /// When the tree already has a root, the previous root becomes the only
    /// child of the new one.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Alloc`] when the node can not be allocated.
    pub fn push_root(&mut self, value: T) -> Result<NodeIndex, TreeError> {
        let node = self.nodes.try_insert(NodeData::new(value))?;

        if let Some(old_root) = self.root.replace(node) {
            self.attach_last(old_root, node);
        }

        Ok(node)
    }

    /// Inserts a value as the last child of `parent`.
    ///
    /// ```
    /// # use arbor::Tree;
    /// let mut tree = Tree::with_root(0);
    /// let root = tree.root().unwrap();
    /// let a = tree.push(root, 1).unwrap();
    /// let b = tree.push(root, 2).unwrap();
    ///
    /// assert!(tree.children(root).eq([a, b]));
    /// assert_eq!(tree.parent(b), Some(root));
    /// ```
    ///
    /// # Errors
    ///
    ///  - When `parent` is not in the tree.
    ///  - When the node can not be allocated.
    pub fn push(&mut self, parent: NodeIndex, value: T) -> Result<NodeIndex, TreeError> {
        self.check(parent)?;
        let node = self.nodes.try_insert(NodeData::new(value))?;
        self.attach_last(node, parent);
        Ok(node)
    }

    /// Inserts a value as the first child of `parent`.
    ///
    /// # Errors
    ///
    ///  - When `parent` is not in the tree.
    ///  - When the node can not be allocated.
    pub fn push_first(&mut self, parent: NodeIndex, value: T) -> Result<NodeIndex, TreeError> {
        self.check(parent)?;
        let node = self.nodes.try_insert(NodeData::new(value))?;
        self.attach_first(node, parent);
        Ok(node)
    }

    /// Inserts a value as the previous sibling of `position`.
    ///
    /// When `position` is the root, the new node becomes the root and the
    /// previous root its only child.
    ///
    /// # Errors
    ///
    ///  - When `position` is not in the tree.
    ///  - When the node can not be allocated.
    pub fn insert_before(
        &mut self,
        position: NodeIndex,
        value: T,
    ) -> Result<NodeIndex, TreeError> {
        let parent = self
            .node_links(position)
            .ok_or(TreeError::InvalidNode(position))?
            .parent;
        let node = self.nodes.try_insert(NodeData::new(value))?;

        match parent {
            Some(_) => self.attach_before(node, position),
            None => {
                self.root = Some(node);
                self.attach_last(position, node);
            }
        }

        Ok(node)
    }

    /// Inserts a value as the next sibling of `position`.
    ///
    /// # Errors
    ///
    ///  - When `position` is not in the tree.
    ///  - When `position` is the root.
    ///  - When the node can not be allocated.
    pub fn insert_after(
        &mut self,
        position: NodeIndex,
        value: T,
    ) -> Result<NodeIndex, TreeError> {
        let links = self
            .node_links(position)
            .ok_or(TreeError::InvalidNode(position))?;

        if links.parent.is_none() {
            return Err(TreeError::RelativeToRoot);
        }

        let node = self.nodes.try_insert(NodeData::new(value))?;
        self.attach_after(node, position);
        Ok(node)
    }

    /// Removes a node together with its subtree.
    ///
    /// Returns the node that follows the removed subtree in pre-order, or
    /// `None` when the subtree was the end of the tree. Handles to the removed
    /// nodes become invalid; all other handles stay valid.
    ///
    /// ```
    /// # use arbor::Tree;
    /// let mut tree = Tree::with_root('r');
    /// let root = tree.root().unwrap();
    /// let a = tree.push(root, 'a').unwrap();
    /// tree.push(a, 'c').unwrap();
    /// let b = tree.push(root, 'b').unwrap();
    ///
    /// assert_eq!(tree.erase(a), Ok(Some(b)));
    /// assert!(tree.iter().copied().eq(['r', 'b']));
    /// assert!(tree.erase(a).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidNode`] when `node` is not in the tree.
    pub fn erase(&mut self, node: NodeIndex) -> Result<Option<NodeIndex>, TreeError> {
        let (_, next) = self.cut(node)?;
        Ok(next)
    }

    /// Removes a node together with its subtree, returning the node's value.
    ///
    /// The values of the node's descendants are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidNode`] when `node` is not in the tree.
    pub fn remove(&mut self, node: NodeIndex) -> Result<T, TreeError> {
        let (value, _) = self.cut(node)?;
        Ok(value)
    }

    /// Removes all nodes.
    ///
    /// Handles to the removed nodes stay invalid even once their storage is
    /// reused.
    pub fn clear(&mut self) {
        debug!(nodes = self.len(), "clearing tree");
        self.nodes.clear();
        self.root = None;
    }

    /// Replaces the contents of the tree with a deep copy of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Alloc`] when the copy can not be allocated. The
    /// tree is left unchanged in that case.
    pub fn assign(&mut self, other: &Self) -> Result<(), TreeError>
    where
        T: Clone,
    {
        *self = other.try_clone()?;
        trace!(nodes = self.len(), "assigned tree");
        Ok(())
    }

    /// Deep-copies the tree, reporting allocation failure as an error.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Alloc`] when the copy can not be allocated.
    pub fn try_clone(&self) -> Result<Self, TreeError>
    where
        T: Clone,
    {
        Ok(Self {
            nodes: self.nodes.try_clone()?,
            root: self.root,
        })
    }

    /// Exchanges the contents of two trees in constant time.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other)
    }

    /// Moves the contents out of the tree, leaving it empty.
    #[inline]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Moves all nodes to the front of the node storage.
    ///
    /// Returns the map from old to new handles. Every handle obtained before
    /// the call must be translated through the map. Handles that are not in
    /// the map, including those of erased nodes, are rejected afterwards.
    pub fn compact(&mut self) -> NodeMap {
        let mut node_map = NodeMap::new();

        self.nodes.compact(|_, old, new| {
            node_map.insert(old, new);
        });

        for (_, data) in self.nodes.iter_mut() {
            data.links.relink(&node_map);
        }

        self.root = self.root.and_then(|root| node_map.get(&root)).copied();
        debug!(nodes = node_map.len(), "compacted tree");

        node_map
    }

    /// Iterates over the values in pre-order, starting at the root.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Mutably iterates over the values in pre-order, starting at the root.
    ///
    /// Unlike [`Tree::iter`], creating the iterator is not free: it borrows
    /// every node up front, which takes time and memory linear in the number
    /// of slots. Use [`Tree::indices`] with [`Tree::get_mut`] to visit only a
    /// few nodes.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self)
    }

    /// Iterates over the node handles in pre-order, starting at the root.
    #[inline]
    pub fn indices(&self) -> Indices<'_, T> {
        Indices::new(self)
    }

    /// Iterates in pre-order from `node` to the end of the tree.
    ///
    /// Unlike [`Tree::descendants`] the traversal continues past the subtree
    /// of `node` into the following siblings of its ancestors. Yields nothing
    /// for a handle that is not in the tree.
    #[inline]
    pub fn iter_from(&self, node: NodeIndex) -> PreOrder<'_, T> {
        PreOrder::new(self, node, None)
    }

    /// Iterates over the subtree of `node` in pre-order, `node` first.
    ///
    /// Yields nothing for a handle that is not in the tree.
    #[inline]
    pub fn descendants(&self, node: NodeIndex) -> PreOrder<'_, T> {
        PreOrder::new(self, node, Some(node))
    }

    /// Iterates over the node's children.
    #[inline]
    pub fn children(&self, node: NodeIndex) -> Children<'_, T> {
        Children::new(self, node)
    }

    /// Iterates over the node's ancestors, from its parent up to the root.
    #[inline]
    pub fn ancestors(&self, node: NodeIndex) -> Ancestors<'_, T> {
        Ancestors::new(self, node)
    }

    /// Returns the node that follows `node` in pre-order, without leaving the
    /// subtree of `stop`.
    pub(crate) fn next_pre_order(
        &self,
        node: NodeIndex,
        stop: Option<NodeIndex>,
    ) -> Option<NodeIndex> {
        match self.links(node).children[0] {
            Some(child) => Some(child),
            None => self.next_after_subtree(node, stop),
        }
    }

    /// Returns the node that follows the subtree of `node` in pre-order,
    /// without leaving the subtree of `stop`.
    pub(crate) fn next_after_subtree(
        &self,
        mut node: NodeIndex,
        stop: Option<NodeIndex>,
    ) -> Option<NodeIndex> {
        loop {
            if Some(node) == stop {
                return None;
            }

            let links = self.links(node);

            if let Some(next) = links.siblings[1] {
                return Some(next);
            }

            node = links.parent?;
        }
    }

    #[inline]
    pub(crate) fn node_links(&self, node: NodeIndex) -> Option<&Links> {
        Some(&self.nodes.get(node)?.links)
    }

    #[inline]
    pub(crate) fn links(&self, node: NodeIndex) -> &Links {
        &self.nodes[node].links
    }

    #[inline]
    fn links_mut(&mut self, node: NodeIndex) -> &mut Links {
        &mut self.nodes[node].links
    }

    fn check(&self, node: NodeIndex) -> Result<(), TreeError> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(TreeError::InvalidNode(node))
        }
    }

    /// Removes the subtree of `node`, returning the node's value and the node
    /// following the subtree in pre-order.
    fn cut(&mut self, node: NodeIndex) -> Result<(T, Option<NodeIndex>), TreeError> {
        self.check(node)?;

        let next = self.next_after_subtree(node, None);
        let descendants: Vec<NodeIndex> = self.descendants(node).skip(1).collect();
        let data = self
            .nodes
            .remove(node)
            .ok_or(TreeError::InvalidNode(node))?;

        self.unlink(&data.links);

        if self.root == Some(node) {
            self.root = None;
        }

        for descendant in &descendants {
            self.nodes.remove(*descendant);
        }

        trace!(?node, removed = descendants.len() + 1, "erased subtree");
        Ok((data.value, next))
    }

    /// Attaches a detached node as the last child of a parent node.
    fn attach_last(&mut self, node: NodeIndex, parent: NodeIndex) {
        self.links_mut(parent).child_count += 1;
        let prev = replace(&mut self.links_mut(parent).children[1], Some(node));

        {
            let links = self.links_mut(node);
            links.parent = Some(parent);
            links.siblings = [prev, None];
        }

        match prev {
            Some(prev) => self.links_mut(prev).siblings[1] = Some(node),
            None => self.links_mut(parent).children[0] = Some(node),
        }
    }

    /// Attaches a detached node as the first child of a parent node.
    fn attach_first(&mut self, node: NodeIndex, parent: NodeIndex) {
        self.links_mut(parent).child_count += 1;
        let next = replace(&mut self.links_mut(parent).children[0], Some(node));

        {
            let links = self.links_mut(node);
            links.parent = Some(parent);
            links.siblings = [None, next];
        }

        match next {
            Some(next) => self.links_mut(next).siblings[0] = Some(node),
            None => self.links_mut(parent).children[1] = Some(node),
        }
    }

    /// Attaches a detached node before a node that has a parent.
    fn attach_before(&mut self, node: NodeIndex, before: NodeIndex) {
        let Some(parent) = self.links(before).parent else {
            return;
        };

        self.links_mut(parent).child_count += 1;
        let before_prev = replace(&mut self.links_mut(before).siblings[0], Some(node));

        {
            let links = self.links_mut(node);
            links.parent = Some(parent);
            links.siblings = [before_prev, Some(before)];
        }

        match before_prev {
            Some(prev) => self.links_mut(prev).siblings[1] = Some(node),
            None => self.links_mut(parent).children[0] = Some(node),
        }
    }

    /// Attaches a detached node after a node that has a parent.
    fn attach_after(&mut self, node: NodeIndex, after: NodeIndex) {
        let Some(parent) = self.links(after).parent else {
            return;
        };

        self.links_mut(parent).child_count += 1;
        let after_next = replace(&mut self.links_mut(after).siblings[1], Some(node));

        {
            let links = self.links_mut(node);
            links.parent = Some(parent);
            links.siblings = [Some(after), after_next];
        }

        match after_next {
            Some(next) => self.links_mut(next).siblings[0] = Some(node),
            None => self.links_mut(parent).children[1] = Some(node),
        }
    }

    /// Closes the gap left in the parent's child list by a removed node.
    fn unlink(&mut self, links: &Links) {
        let Some(parent) = links.parent else {
            return;
        };

        self.links_mut(parent).child_count -= 1;
        let [prev, next] = links.siblings;

        match prev {
            Some(prev) => self.links_mut(prev).siblings[1] = next,
            None => self.links_mut(parent).children[0] = next,
        }

        match next {
            Some(next) => self.links_mut(next).siblings[0] = prev,
            None => self.links_mut(parent).children[1] = prev,
        }
    }
}

impl<T> Index<NodeIndex> for Tree<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics when `node` is not in the tree.
    fn index(&self, node: NodeIndex) -> &Self::Output {
        &self.nodes[node].value
    }
}

impl<T> IndexMut<NodeIndex> for Tree<T> {
    /// # Panics
    ///
    /// Panics when `node` is not in the tree.
    fn index_mut(&mut self, node: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[node].value
    }
}

impl<'a, T> IntoIterator for &'a Tree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Tree<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
