//! Root filtering over flat arena ranges.
//!
//! The parser flattens every node of a `nodes [ ... ]` list into the shared
//! arena, nested children included. Root filtering removes from that flat
//! range any node that some other node in the range claims as a child,
//! leaving exactly the list's top-level entries. This keeps the scene a
//! tree (no node under two parents) without parent-pointer fields.

use core::fmt;

use crate::id::NodeId;
use crate::node::SceneTree;

/// Default bitset capacity; matches the default node arena capacity.
pub const DEFAULT_ROOT_FILTER_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    /// A node id exceeded the bitset capacity.
    IdOutOfRange { id: NodeId, capacity: usize },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdOutOfRange { id, capacity } => {
                write!(f, "node id {id} exceeds root-filter capacity {capacity}")
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Fixed-width presence bitset indexed by `node_id - 1`.
#[derive(Debug)]
pub struct PresenceBitset {
    words: Vec<u64>,
    capacity: usize,
}

impl PresenceBitset {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            capacity,
        }
    }

    /// Mark an id as present.
    ///
    /// # Errors
    /// Returns [`FilterError::IdOutOfRange`] when `id - 1` exceeds capacity.
    pub fn set(&mut self, id: NodeId) -> Result<(), FilterError> {
        let index = id.index();
        if id.is_none() || index >= self.capacity {
            return Err(FilterError::IdOutOfRange {
                id,
                capacity: self.capacity,
            });
        }
        self.words[index / 64] |= 1u64 << (index % 64);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        let index = id.index();
        if id.is_none() || index >= self.capacity {
            return false;
        }
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }
}

/// Return the subset of `candidates` that no other candidate claims as a
/// child. Candidates are the node ids emitted into the arena while one
/// `nodes [ ... ]` list was parsed.
///
/// # Errors
/// Returns [`FilterError::IdOutOfRange`] when an id exceeds `capacity`.
pub fn root_filter(
    tree: &SceneTree,
    candidates: &[NodeId],
    capacity: usize,
) -> Result<Vec<NodeId>, FilterError> {
    let mut referenced = PresenceBitset::with_capacity(capacity);
    for &id in candidates {
        if let Some(node) = tree.node(id) {
            for &child in node.children() {
                referenced.set(child)?;
            }
        }
    }
    Ok(candidates
        .iter()
        .copied()
        .filter(|&id| !referenced.contains(id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector;
    use crate::id::StableId;
    use crate::node::{Children, Node, RectNode};

    fn push_rect(tree: &mut SceneTree, children: &[NodeId]) -> NodeId {
        let node = Node::Rect(RectNode {
            node_id: tree.next_node_id(),
            stable_id: StableId::NONE,
            declared_id: None,
            size: Vector::new(1, 1),
            position: Vector::ZERO,
            local_position: Vector::ZERO,
            background: None,
            children: Children::from_slice(children),
        });
        tree.push(node).unwrap()
    }

    #[test]
    fn children_are_filtered_out() {
        let mut tree = SceneTree::with_capacity(8);
        let inner = push_rect(&mut tree, &[]);
        let outer = push_rect(&mut tree, &[inner]);
        let roots =
            root_filter(&tree, &[inner, outer], DEFAULT_ROOT_FILTER_CAPACITY).unwrap();
        assert_eq!(roots, vec![outer]);
    }

    #[test]
    fn siblings_all_survive() {
        let mut tree = SceneTree::with_capacity(8);
        let a = push_rect(&mut tree, &[]);
        let b = push_rect(&mut tree, &[]);
        let roots = root_filter(&tree, &[a, b], DEFAULT_ROOT_FILTER_CAPACITY).unwrap();
        assert_eq!(roots, vec![a, b]);
    }

    #[test]
    fn oversized_id_is_rejected() {
        let mut tree = SceneTree::with_capacity(8);
        let _padding = push_rect(&mut tree, &[]);
        let child = push_rect(&mut tree, &[]);
        let parent = push_rect(&mut tree, &[child]);
        let err = root_filter(&tree, &[child, parent], 1).unwrap_err();
        assert!(matches!(err, FilterError::IdOutOfRange { .. }));
    }
}
