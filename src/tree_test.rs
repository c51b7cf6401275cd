use proptest::prelude::*;
use rstest::rstest;

use crate::memory::{AllocError, EntityIndex};
use crate::{NodeIndex, Tree, TreeError};

/// Builds a tree from a list of `(parent, value)` insertions.
///
/// The root holds `0`. Every parent is taken modulo the number of nodes
/// inserted so far. Returns the tree, the handles in insertion order and the
/// children of every node by insertion position.
fn build(ops: &[(usize, u8)]) -> (Tree<u8>, Vec<NodeIndex>, Vec<Vec<usize>>) {
    let mut tree = Tree::with_root(0);
    let mut nodes = vec![tree.root().unwrap()];
    let mut children = vec![Vec::new()];

    for &(parent, value) in ops {
        let parent = parent % nodes.len();
        nodes.push(tree.push(nodes[parent], value).unwrap());
        children[parent].push(nodes.len() - 1);
        children.push(Vec::new());
    }

    (tree, nodes, children)
}

fn insertions() -> impl Strategy<Value = Vec<(usize, u8)>> {
    prop::collection::vec((any::<usize>(), any::<u8>()), 0..64)
}

fn pre_order(children: &[Vec<usize>], node: usize, out: &mut Vec<usize>) {
    out.push(node);
    for &child in &children[node] {
        pre_order(children, child, out);
    }
}

/// Builds `R(A(C), B)`.
fn sample() -> (Tree<char>, [NodeIndex; 4]) {
    let mut tree = Tree::new();
    let r = tree.push_root('R').unwrap();
    let a = tree.push(r, 'A').unwrap();
    let b = tree.push(r, 'B').unwrap();
    let c = tree.push(a, 'C').unwrap();
    (tree, [r, a, b, c])
}

#[test]
fn pre_order_traversal() {
    let (tree, [r, a, b, c]) = sample();
    assert!(tree.iter().copied().eq(['R', 'A', 'C', 'B']));
    assert!(tree.indices().eq([r, a, c, b]));
    assert_eq!(tree.len(), 4);
}

#[test]
fn ancestor_relation() {
    let (tree, [_, a, b, c]) = sample();
    assert!(tree.is_ancestor(a, c));
    assert!(!tree.is_ancestor(b, c));
}

#[test]
fn new_tree_is_empty() {
    let tree = Tree::<String>::new();
    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.root(), None);
    assert_eq!(tree, Tree::default());
}

#[test]
fn with_root_holds_one_node() {
    let tree = Tree::from(42);
    assert!(!tree.is_empty());
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.root_value(), Ok(&42));
    assert_eq!(tree.depth(tree.root().unwrap()), Some(0));
}

#[test]
fn erase_sole_node() {
    let mut tree = Tree::with_root(42);
    let root = tree.root().unwrap();
    assert_eq!(tree.erase(root), Ok(None));
    assert!(tree.is_empty());
    assert_eq!(tree.iter().next(), None);
    assert_eq!(tree.root_value(), Err(TreeError::Empty));
}

#[test]
fn erase_keeps_siblings_and_ancestors() {
    let (mut tree, [r, a, b, c]) = sample();
    assert_eq!(tree.erase(a), Ok(Some(b)));

    assert!(!tree.contains(a));
    assert!(!tree.contains(c));
    assert_eq!(tree[r], 'R');
    assert_eq!(tree[b], 'B');
    assert_eq!(tree.parent(b), Some(r));
    assert!(tree.children(r).eq([b]));
}

#[test]
fn erase_returns_next_in_pre_order() {
    let (mut tree, [r, a, b, c]) = sample();
    let d = tree.push(b, 'D').unwrap();

    // `C` is the last child of `A`, so the next node is `A`'s sibling.
    assert_eq!(tree.erase(c), Ok(Some(b)));
    assert_eq!(tree.erase(d), Ok(None));
    assert_eq!(tree.erase(b), Ok(None));
    assert!(tree.indices().eq([r, a]));
}

#[test]
fn stale_handle_is_rejected_after_reuse() {
    let (mut tree, [_, a, b, c]) = sample();
    tree.erase(c).unwrap();
    let d = tree.push(b, 'D').unwrap();

    assert_eq!(d.index(), c.index());
    assert_eq!(tree.get(c), None);
    assert_eq!(tree.get(d), Some(&'D'));
    assert_eq!(tree.erase(c), Err(TreeError::InvalidNode(c)));
    assert_eq!(tree.push(c, 'E'), Err(TreeError::InvalidNode(c)));
    assert_eq!(tree.child_count(a), 0);
}

#[test]
fn clear_invalidates_everything() {
    let (mut tree, [r, ..]) = sample();
    tree.clear();

    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert!(!tree.contains(r));

    let new_root = tree.push_root('X').unwrap();
    assert!(!tree.contains(r));
    assert_eq!(tree[new_root], 'X');
}

#[test]
fn assign_replaces_contents() {
    let (source, _) = sample();
    let mut tree = Tree::with_root('Z');
    tree.assign(&source).unwrap();

    assert_eq!(tree, source);
    tree.root_value_mut().map(|value| *value = 'Q').unwrap();
    assert_eq!(source.root_value(), Ok(&'R'));
}

#[test]
fn swap_exchanges_contents() {
    let (mut a, _) = sample();
    let mut b = Tree::with_root('Z');
    let (expected, _) = sample();

    a.swap(&mut b);

    assert_eq!(a.root_value(), Ok(&'Z'));
    assert_eq!(b, expected);
}

#[rstest]
#[case::push(|tree: &mut Tree<char>, node| tree.push(node, 'x'))]
#[case::push_first(|tree: &mut Tree<char>, node| tree.push_first(node, 'x'))]
#[case::insert_before(|tree: &mut Tree<char>, node| tree.insert_before(node, 'x'))]
#[case::insert_after(|tree: &mut Tree<char>, node| tree.insert_after(node, 'x'))]
fn insertion_under_erased_node_fails(
    #[case] insert: fn(&mut Tree<char>, NodeIndex) -> Result<NodeIndex, TreeError>,
) {
    let (mut tree, [_, a, ..]) = sample();
    tree.erase(a).unwrap();
    let before = tree.clone();

    assert_eq!(insert(&mut tree, a), Err(TreeError::InvalidNode(a)));
    assert_eq!(tree, before);
    assert_eq!(tree.len(), 2);
}

#[test]
fn erased_handle_stays_invalid_after_compact() {
    let (mut tree, [r, a, b, c]) = sample();
    tree.erase(a).unwrap();

    let node_map = tree.compact();
    let r = node_map[&r];
    let d = tree.push(r, 'D').unwrap();

    assert!(!node_map.contains_key(&a));
    for stale in [a, b, c] {
        assert_eq!(tree.get(stale), None);
        assert_eq!(tree.erase(stale), Err(TreeError::InvalidNode(stale)));
    }
    assert_eq!(tree[node_map[&b]], 'B');
    assert_eq!(tree[d], 'D');
    assert_eq!(tree.len(), 3);
}

#[test]
fn failed_reserve_leaves_tree_unchanged() {
    let (mut tree, _) = sample();
    let before = tree.clone();
    let capacity = tree.capacity();

    assert!(matches!(
        tree.reserve(usize::MAX),
        Err(TreeError::Alloc(AllocError::Exhausted(_)))
    ));
    assert_eq!(tree, before);
    assert_eq!(tree.len(), before.len());
    assert_eq!(tree.capacity(), capacity);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(100)]
fn reserve_then_fill(#[case] additional: usize) {
    let mut tree = Tree::with_capacity(1);
    let root = tree.push_root(0).unwrap();
    tree.reserve(additional).unwrap();
    let capacity = tree.capacity();

    for i in 0..additional {
        tree.push(root, i + 1).unwrap();
    }

    assert!(capacity >= additional + 1);
    assert_eq!(tree.capacity(), capacity);
    assert_eq!(tree.len(), additional + 1);
    assert!(tree.max_size() >= tree.len());
}

proptest! {
    #[test]
    fn iteration_matches_model(ops in insertions()) {
        let (tree, nodes, children) = build(&ops);
        let mut order = Vec::new();
        pre_order(&children, 0, &mut order);

        prop_assert_eq!(tree.len(), nodes.len());
        prop_assert!(tree.indices().eq(order.iter().map(|&i| nodes[i])));
        prop_assert_eq!(tree.iter().count(), tree.len());
    }

    #[test]
    fn depth_grows_by_one_per_level(ops in insertions()) {
        let (tree, nodes, _) = build(&ops);

        for &node in &nodes {
            let depth = tree.depth(node).unwrap();
            match tree.parent(node) {
                Some(parent) => prop_assert_eq!(depth, tree.depth(parent).unwrap() + 1),
                None => prop_assert_eq!(depth, 0),
            }
        }
    }

    #[test]
    fn clear_empties(ops in insertions()) {
        let (mut tree, _, _) = build(&ops);
        tree.clear();
        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.len(), 0);
    }

    #[test]
    fn erase_removes_subtree(
        ops in insertions(),
        pick in any::<usize>(),
    ) {
        let (mut tree, nodes, _) = build(&ops);
        let node = nodes[pick % nodes.len()];
        let before = tree.len();
        let subtree = tree.subtree_len(node).unwrap();
        let parent = tree.parent(node);

        tree.erase(node).unwrap();

        prop_assert_eq!(before - tree.len(), subtree);
        prop_assert_eq!(tree.iter().count(), tree.len());
        if let Some(parent) = parent {
            prop_assert!(tree.contains(parent));
            prop_assert!(tree.ancestors(parent).all(|ancestor| tree.contains(ancestor)));
        }
    }

    #[test]
    fn clone_is_equal_and_disjoint(ops in insertions()) {
        let (tree, _, _) = build(&ops);
        let mut copy = tree.clone();
        prop_assert_eq!(&copy, &tree);

        for value in copy.iter_mut() {
            *value = value.wrapping_add(1);
        }

        prop_assert_ne!(&copy, &tree);
        prop_assert!(tree.iter().zip(copy.iter()).all(|(a, b)| a.wrapping_add(1) == *b));
    }

    #[test]
    fn take_moves_contents(ops in insertions()) {
        let (mut tree, _, _) = build(&ops);
        let expected = tree.clone();
        let moved = tree.take();

        prop_assert!(tree.is_empty());
        prop_assert_eq!(moved, expected);
    }

    #[test]
    fn equality_detects_changed_value(
        ops in insertions(),
        pick in any::<usize>(),
    ) {
        let (tree, _, _) = build(&ops);
        let (mut other, nodes, _) = build(&ops);
        prop_assert_eq!(&tree, &other);

        let node = nodes[pick % nodes.len()];
        other[node] = other[node].wrapping_add(1);
        prop_assert_ne!(&tree, &other);
    }

    #[test]
    fn compact_preserves_tree(
        ops in insertions(),
        picks in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let (mut tree, nodes, _) = build(&ops);

        for pick in picks {
            let node = nodes[pick % nodes.len()];
            let _ = tree.erase(node);
        }

        let erased: Vec<_> = nodes.iter().copied().filter(|&n| !tree.contains(n)).collect();
        let expected = tree.clone();
        let node_map = tree.compact();

        prop_assert_eq!(&tree, &expected);
        prop_assert_eq!(node_map.len(), tree.len());
        for (&old, &new) in &node_map {
            prop_assert_eq!(tree.get(new), expected.get(old));
        }
        for node in erased {
            prop_assert_eq!(tree.get(node), None);
            prop_assert_eq!(tree.erase(node), Err(TreeError::InvalidNode(node)));
        }
    }
}
