//! The polymorphic node model and the scene tree that owns it.
//!
//! `Node` is a tagged sum of the three drawable/structural variants. Nodes
//! live in a single bounded arena owned by [`SceneTree`]; parents reference
//! children by [`NodeId`], and a node's dense id is always `arena slot + 1`.
//!
//! Coordinates follow the accumulation scheme set up by the parser:
//! `local_position` is the sum of every ancestor's `position`, so a node's
//! world origin is `local_position + position` without a second traversal.

use smallvec::SmallVec;

use crate::arena::{Arena, ArenaOverflow};
use crate::geometry::{Color, Matrix, Vector};
use crate::id::{NodeId, StableId};

/// Child list storage. Most nodes have a handful of children.
pub type Children = SmallVec<[NodeId; 4]>;

/// A solid-color rectangle, optionally with children.
#[derive(Debug, Clone, PartialEq)]
pub struct RectNode {
    pub node_id: NodeId,
    pub stable_id: StableId,
    pub declared_id: Option<String>,
    pub size: Vector,
    pub position: Vector,
    pub local_position: Vector,
    pub background: Option<Color>,
    pub children: Children,
}

/// A text run. Bounds are estimated until font metrics arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub node_id: NodeId,
    pub stable_id: StableId,
    pub declared_id: Option<String>,
    pub body: String,
    pub color: Color,
    pub position: Vector,
    pub local_position: Vector,
    pub text_size: u16,
}

/// A transform group. Emits no geometry of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    pub node_id: NodeId,
    pub stable_id: StableId,
    pub declared_id: Option<String>,
    pub position: Vector,
    pub local_position: Vector,
    pub matrix: Option<Matrix>,
    pub children: Children,
}

/// A scene-tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rect(RectNode),
    Text(TextNode),
    Transform(TransformNode),
}

impl Node {
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Rect(rect) => rect.node_id,
            Self::Text(text) => text.node_id,
            Self::Transform(transform) => transform.node_id,
        }
    }

    #[must_use]
    pub fn stable_id(&self) -> StableId {
        match self {
            Self::Rect(rect) => rect.stable_id,
            Self::Text(text) => text.stable_id,
            Self::Transform(transform) => transform.stable_id,
        }
    }

    #[must_use]
    pub fn position(&self) -> Vector {
        match self {
            Self::Rect(rect) => rect.position,
            Self::Text(text) => text.position,
            Self::Transform(transform) => transform.position,
        }
    }

    #[must_use]
    pub fn local_position(&self) -> Vector {
        match self {
            Self::Rect(rect) => rect.local_position,
            Self::Text(text) => text.local_position,
            Self::Transform(transform) => transform.local_position,
        }
    }

    /// World origin: `local_position + position`.
    #[must_use]
    pub fn world_position(&self) -> Vector {
        self.local_position() + self.position()
    }

    /// Direct children. Text nodes are always leaves.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match self {
            Self::Rect(rect) => &rect.children,
            Self::Transform(transform) => &transform.children,
            Self::Text(_) => &[],
        }
    }

    #[must_use]
    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            Self::Rect(rect) => Some(&mut rect.children),
            Self::Transform(transform) => Some(&mut transform.children),
            Self::Text(_) => None,
        }
    }

    pub fn set_position(&mut self, position: Vector) {
        match self {
            Self::Rect(rect) => rect.position = position,
            Self::Text(text) => text.position = position,
            Self::Transform(transform) => transform.position = position,
        }
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Rect(_) => "rect",
            Self::Text(_) => "text",
            Self::Transform(_) => "transform",
        }
    }
}

/// An app's subtree within a workspace or the system layer.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub id: String,
    pub size: Vector,
    pub position: Vector,
    pub background: Color,
    pub children: Children,
}

/// A group of apps the user can switch between.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    pub apps: Vec<App>,
}

/// The drawable desktop layer plus its workspaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Desktop {
    pub size: Vector,
    pub background: Option<Color>,
    pub active_workspace: Option<usize>,
    pub workspaces: Vec<Workspace>,
    pub nodes: Vec<NodeId>,
}

impl Default for Desktop {
    fn default() -> Self {
        Self {
            size: Vector::ZERO,
            background: None,
            active_workspace: None,
            workspaces: Vec::new(),
            nodes: Vec::new(),
        }
    }
}

/// System-level apps (shell chrome, lock screens). Parsed, never lowered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct System {
    pub apps: Vec<App>,
}

/// Root of the retained scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Root {
    pub desktop: Desktop,
    pub system: System,
}

/// Default node arena capacity; matches the root-filter bitset default.
pub const DEFAULT_NODE_CAPACITY: usize = 4096;

/// The retained scene: a [`Root`] plus the arena that owns every node.
#[derive(Debug)]
pub struct SceneTree {
    pub root: Root,
    nodes: Arena<Node>,
}

impl SceneTree {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_NODE_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(node_capacity: usize) -> Self {
        Self {
            root: Root::default(),
            nodes: Arena::with_capacity(node_capacity),
        }
    }

    /// The id the next pushed node will receive.
    #[must_use]
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u64 + 1)
    }

    /// Push a node into the arena. The node's `node_id` must be the value
    /// [`Self::next_node_id`] returned when it was constructed.
    ///
    /// # Errors
    /// Returns [`ArenaOverflow`] when the node arena is full.
    pub fn push(&mut self, node: Node) -> Result<NodeId, ArenaOverflow> {
        let id = node.node_id();
        debug_assert_eq!(id, self.next_node_id());
        self.nodes.push(node)?;
        Ok(id)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.index() as u32)
    }

    #[must_use]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.index() as u32)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn node_capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// All nodes in a dense id range, in id order.
    #[must_use]
    pub fn nodes_in_range(&self, first: NodeId, last_exclusive: NodeId) -> &[Node] {
        self.nodes.range(first.index()..last_exclusive.index())
    }

    /// World origin of a node: `local_position + position`.
    #[must_use]
    pub fn world_position(&self, id: NodeId) -> Option<Vector> {
        self.node(id).map(Node::world_position)
    }

    /// True if `ancestor` is `node` or appears on the path from `node`
    /// downward — used by structural patch validation.
    #[must_use]
    pub fn is_descendant(&self, ancestor: NodeId, node: NodeId) -> bool {
        if ancestor == node {
            return true;
        }
        let Some(start) = self.node(ancestor) else {
            return false;
        };
        let mut stack: Vec<NodeId> = start.children().to_vec();
        while let Some(current) = stack.pop() {
            if current == node {
                return true;
            }
            if let Some(n) = self.node(current) {
                stack.extend_from_slice(n.children());
            }
        }
        false
    }
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(tree: &SceneTree, position: Vector, local: Vector) -> Node {
        Node::Rect(RectNode {
            node_id: tree.next_node_id(),
            stable_id: StableId::NONE,
            declared_id: None,
            size: Vector::new(10, 10),
            position,
            local_position: local,
            background: None,
            children: Children::new(),
        })
    }

    #[test]
    fn ids_are_dense_and_monotonic() {
        let mut tree = SceneTree::with_capacity(8);
        let a = tree.push(rect(&tree, Vector::ZERO, Vector::ZERO)).unwrap();
        let b = tree.push(rect(&tree, Vector::ZERO, Vector::ZERO)).unwrap();
        assert_eq!(a, NodeId(1));
        assert_eq!(b, NodeId(2));
        assert!(tree.node(b).is_some());
        assert!(tree.node(NodeId(3)).is_none());
    }

    #[test]
    fn world_position_is_local_plus_position() {
        let mut tree = SceneTree::with_capacity(8);
        let id = tree
            .push(rect(&tree, Vector::new(3, 4), Vector::new(10, 10)))
            .unwrap();
        assert_eq!(tree.world_position(id), Some(Vector::new(13, 14)));
    }

    #[test]
    fn descendant_walk_follows_children() {
        let mut tree = SceneTree::with_capacity(8);
        let child = tree.push(rect(&tree, Vector::ZERO, Vector::ZERO)).unwrap();
        let mut parent = rect(&tree, Vector::ZERO, Vector::ZERO);
        parent.children_mut().unwrap().push(child);
        let parent = tree.push(parent).unwrap();
        assert!(tree.is_descendant(parent, child));
        assert!(!tree.is_descendant(child, parent));
    }
}
