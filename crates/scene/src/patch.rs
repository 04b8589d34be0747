//! Patch-op validation and application.
//!
//! Apps mutate their own subtrees through high-level patch ops delivered in
//! batches. The wire protocol lives outside the core; this module is the
//! validation and application surface it lands on. A batch is validated in
//! full first — each op against the tree plus the structural effects of the
//! ops accepted before it — then the surviving ops are applied in declared
//! order. Rejected ops are logged and reported per index; rejections
//! accumulate toward a configurable hard-failure escalation.

use core::fmt;
use std::collections::HashSet;

use crate::geometry::{Color, Matrix, Vector};
use crate::id::NodeId;
use crate::node::{App, Node, SceneTree};

/// A single app-issued scene mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    SetText { node: NodeId, body: String },
    SetBackground { node: NodeId, background: Option<Color> },
    SetPosition { node: NodeId, position: Vector },
    SetSize { node: NodeId, size: Vector },
    SetTransform { node: NodeId, matrix: Option<Matrix> },
    SetVisibility { node: NodeId, visible: bool },
    SetEnabled { node: NodeId, enabled: bool },
    SetValue { node: NodeId, value: String },
    SetProperty { node: NodeId, name: String, value: String },
    InsertChild { parent: NodeId, child: NodeId, index: usize },
    RemoveNode { node: NodeId },
    ReplaceChildren { parent: NodeId, children: Vec<NodeId> },
    RequestFocus { node: NodeId },
    ClearFocus,
    RequestClose,
}

/// Why a single op was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchError {
    UnknownNode(NodeId),
    CrossAppMutation(NodeId),
    StructuralCycle { parent: NodeId, child: NodeId },
    TypeMismatch { node: NodeId, expected: &'static str },
    UnsupportedProperty { property: String },
    InvalidSize(Vector),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "unknown node {id}"),
            Self::CrossAppMutation(id) => write!(f, "node {id} belongs to another app"),
            Self::StructuralCycle { parent, child } => {
                write!(f, "inserting {child} under {parent} would form a cycle")
            }
            Self::TypeMismatch { node, expected } => {
                write!(f, "node {node} is not a {expected}")
            }
            Self::UnsupportedProperty { property } => {
                write!(f, "property '{property}' is not supported by the core node model")
            }
            Self::InvalidSize(size) => {
                write!(f, "size ({}, {}) must be strictly positive", size.x, size.y)
            }
        }
    }
}

impl std::error::Error for PatchError {}

/// Raised when accumulated violations pass the hard-failure threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTerminated {
    pub violations: u32,
}

impl fmt::Display for SessionTerminated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session terminated after {} protocol violations",
            self.violations
        )
    }
}

impl std::error::Error for SessionTerminated {}

/// Escalation configuration. Soft failure is the default; a session is
/// terminated once total rejections reach `hard_fail_threshold`.
#[derive(Debug, Clone, Copy)]
pub struct PatchPolicy {
    pub hard_fail_threshold: u32,
}

impl Default for PatchPolicy {
    fn default() -> Self {
        Self {
            hard_fail_threshold: 32,
        }
    }
}

/// Focus-category outcomes the host acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequest {
    Focus(NodeId),
    Clear,
    Close,
}

/// Per-batch outcome.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub applied: usize,
    pub rejected: Vec<(usize, PatchError)>,
    pub focus_requests: Vec<FocusRequest>,
}

/// Applies patch batches for one app session.
#[derive(Debug, Default)]
pub struct PatchApplier {
    policy: PatchPolicy,
    violations: u32,
}

impl PatchApplier {
    #[must_use]
    pub fn new(policy: PatchPolicy) -> Self {
        Self {
            policy,
            violations: 0,
        }
    }

    #[must_use]
    pub const fn violations(&self) -> u32 {
        self.violations
    }

    /// Validate and apply one batch against `app`'s subtree.
    ///
    /// The accepted subset is applied in declared order; application cannot
    /// fail once validation has passed, so the batch is all-or-nothing for
    /// that subset.
    ///
    /// # Errors
    /// Returns [`SessionTerminated`] once accumulated rejections reach the
    /// policy threshold. The current batch's accepted ops are still applied.
    pub fn apply_batch(
        &mut self,
        tree: &mut SceneTree,
        app: &mut App,
        ops: Vec<PatchOp>,
    ) -> Result<BatchResult, SessionTerminated> {
        let scope = reachable_set(tree, &app.children);
        let mut result = BatchResult::default();
        let mut accepted: Vec<PatchOp> = Vec::with_capacity(ops.len());
        let mut removed: HashSet<NodeId> = HashSet::new();
        let mut pending_edges: Vec<(NodeId, NodeId)> = Vec::new();

        for (index, op) in ops.into_iter().enumerate() {
            match validate(tree, &scope, &removed, &pending_edges, &op) {
                Ok(()) => {
                    match &op {
                        PatchOp::RemoveNode { node } => {
                            removed.insert(*node);
                        }
                        PatchOp::InsertChild { parent, child, .. } => {
                            pending_edges.push((*parent, *child));
                        }
                        PatchOp::ReplaceChildren { parent, children } => {
                            for child in children {
                                pending_edges.push((*parent, *child));
                            }
                        }
                        _ => {}
                    }
                    accepted.push(op);
                }
                Err(err) => {
                    log::warn!(target: "swen_scene", "patch op {index} rejected: {err}");
                    result.rejected.push((index, err));
                }
            }
        }

        for op in accepted {
            apply(tree, app, op, &mut result.focus_requests);
            result.applied += 1;
        }

        self.violations += result.rejected.len() as u32;
        if self.violations >= self.policy.hard_fail_threshold {
            return Err(SessionTerminated {
                violations: self.violations,
            });
        }
        Ok(result)
    }
}

/// Every node reachable from the app's top-level children.
fn reachable_set(tree: &SceneTree, roots: &[NodeId]) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeId> = roots.to_vec();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(node) = tree.node(id) {
            stack.extend_from_slice(node.children());
        }
    }
    seen
}

fn check_addressable(
    tree: &SceneTree,
    scope: &HashSet<NodeId>,
    removed: &HashSet<NodeId>,
    id: NodeId,
) -> Result<(), PatchError> {
    if tree.node(id).is_none() || removed.contains(&id) {
        return Err(PatchError::UnknownNode(id));
    }
    if !scope.contains(&id) {
        return Err(PatchError::CrossAppMutation(id));
    }
    Ok(())
}

fn check_kind(
    tree: &SceneTree,
    id: NodeId,
    expected: &'static str,
    matches: impl Fn(&Node) -> bool,
) -> Result<(), PatchError> {
    match tree.node(id) {
        Some(node) if matches(node) => Ok(()),
        Some(_) => Err(PatchError::TypeMismatch { node: id, expected }),
        None => Err(PatchError::UnknownNode(id)),
    }
}

/// Would linking `child` under `parent` create a cycle, given the tree plus
/// the batch's already-accepted structural edges?
fn would_cycle(
    tree: &SceneTree,
    pending_edges: &[(NodeId, NodeId)],
    parent: NodeId,
    child: NodeId,
) -> bool {
    if parent == child {
        return true;
    }
    // Search downward from `child` for `parent`.
    let mut stack = vec![child];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == parent {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(node) = tree.node(current) {
            stack.extend_from_slice(node.children());
        }
        for &(from, to) in pending_edges {
            if from == current {
                stack.push(to);
            }
        }
    }
    false
}

fn validate(
    tree: &SceneTree,
    scope: &HashSet<NodeId>,
    removed: &HashSet<NodeId>,
    pending_edges: &[(NodeId, NodeId)],
    op: &PatchOp,
) -> Result<(), PatchError> {
    match op {
        PatchOp::SetText { node, .. } => {
            check_addressable(tree, scope, removed, *node)?;
            check_kind(tree, *node, "text", |n| matches!(n, Node::Text(_)))
        }
        PatchOp::SetBackground { node, .. } => {
            check_addressable(tree, scope, removed, *node)?;
            check_kind(tree, *node, "rect", |n| matches!(n, Node::Rect(_)))
        }
        PatchOp::SetPosition { node, .. } => check_addressable(tree, scope, removed, *node),
        PatchOp::SetSize { node, size } => {
            check_addressable(tree, scope, removed, *node)?;
            check_kind(tree, *node, "rect", |n| matches!(n, Node::Rect(_)))?;
            if !size.is_strictly_positive() {
                return Err(PatchError::InvalidSize(*size));
            }
            Ok(())
        }
        PatchOp::SetTransform { node, .. } => {
            check_addressable(tree, scope, removed, *node)?;
            check_kind(tree, *node, "transform", |n| matches!(n, Node::Transform(_)))
        }
        PatchOp::SetVisibility { node, .. } => {
            check_addressable(tree, scope, removed, *node)?;
            Err(PatchError::UnsupportedProperty {
                property: "visibility".to_owned(),
            })
        }
        PatchOp::SetEnabled { node, .. } => {
            check_addressable(tree, scope, removed, *node)?;
            Err(PatchError::UnsupportedProperty {
                property: "enabled".to_owned(),
            })
        }
        PatchOp::SetValue { node, .. } => {
            check_addressable(tree, scope, removed, *node)?;
            Err(PatchError::UnsupportedProperty {
                property: "value".to_owned(),
            })
        }
        PatchOp::SetProperty { node, name, .. } => {
            check_addressable(tree, scope, removed, *node)?;
            Err(PatchError::UnsupportedProperty {
                property: name.clone(),
            })
        }
        PatchOp::InsertChild { parent, child, .. } => {
            check_addressable(tree, scope, removed, *parent)?;
            check_addressable(tree, scope, removed, *child)?;
            check_kind(tree, *parent, "container", |n| {
                matches!(n, Node::Rect(_) | Node::Transform(_))
            })?;
            if would_cycle(tree, pending_edges, *parent, *child) {
                return Err(PatchError::StructuralCycle {
                    parent: *parent,
                    child: *child,
                });
            }
            Ok(())
        }
        PatchOp::RemoveNode { node } => check_addressable(tree, scope, removed, *node),
        PatchOp::ReplaceChildren { parent, children } => {
            check_addressable(tree, scope, removed, *parent)?;
            check_kind(tree, *parent, "container", |n| {
                matches!(n, Node::Rect(_) | Node::Transform(_))
            })?;
            for &child in children {
                check_addressable(tree, scope, removed, child)?;
                if would_cycle(tree, pending_edges, *parent, child) {
                    return Err(PatchError::StructuralCycle {
                        parent: *parent,
                        child,
                    });
                }
            }
            Ok(())
        }
        PatchOp::RequestFocus { node } => check_addressable(tree, scope, removed, *node),
        PatchOp::ClearFocus | PatchOp::RequestClose => Ok(()),
    }
}

/// Shift a subtree's accumulated coordinates by `delta`.
fn shift_local(tree: &mut SceneTree, root: NodeId, delta: Vector) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(node) = tree.node_mut(id) else {
            continue;
        };
        match node {
            Node::Rect(rect) => rect.local_position = rect.local_position + delta,
            Node::Text(text) => text.local_position = text.local_position + delta,
            Node::Transform(transform) => {
                transform.local_position = transform.local_position + delta;
            }
        }
        stack.extend_from_slice(node.children());
    }
}

/// Detach `child` from whatever parent currently holds it.
fn detach(tree: &mut SceneTree, app: &mut App, child: NodeId) {
    app.children.retain(|id| *id != child);
    let mut stack: Vec<NodeId> = app.children.to_vec();
    let mut visited = HashSet::new();
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = tree.node_mut(id) else {
            continue;
        };
        if let Some(children) = node.children_mut() {
            children.retain(|c| *c != child);
        }
        stack.extend_from_slice(node.children());
    }
}

fn apply(tree: &mut SceneTree, app: &mut App, op: PatchOp, focus: &mut Vec<FocusRequest>) {
    match op {
        PatchOp::SetText { node, body } => {
            if let Some(Node::Text(text)) = tree.node_mut(node) {
                text.body = body;
            }
        }
        PatchOp::SetBackground { node, background } => {
            if let Some(Node::Rect(rect)) = tree.node_mut(node) {
                rect.background = background;
            }
        }
        PatchOp::SetPosition { node, position } => {
            let Some(n) = tree.node(node) else { return };
            let delta = Vector::new(position.x - n.position().x, position.y - n.position().y);
            if let Some(n) = tree.node_mut(node) {
                n.set_position(position);
            }
            // Children pre-accumulate the parent position; keep them true.
            let children: Vec<NodeId> =
                tree.node(node).map_or(Vec::new(), |n| n.children().to_vec());
            for child in children {
                shift_local(tree, child, delta);
            }
        }
        PatchOp::SetSize { node, size } => {
            if let Some(Node::Rect(rect)) = tree.node_mut(node) {
                rect.size = size;
            }
        }
        PatchOp::SetTransform { node, matrix } => {
            if let Some(Node::Transform(transform)) = tree.node_mut(node) {
                transform.matrix = matrix;
            }
        }
        PatchOp::InsertChild {
            parent,
            child,
            index,
        } => {
            detach(tree, app, child);
            let parent_world = tree.node(parent).map_or(Vector::ZERO, Node::world_position);
            let child_local = tree
                .node(child)
                .map_or(Vector::ZERO, Node::local_position);
            let delta = Vector::new(
                parent_world.x - child_local.x,
                parent_world.y - child_local.y,
            );
            shift_local(tree, child, delta);
            if let Some(node) = tree.node_mut(parent) {
                if let Some(children) = node.children_mut() {
                    let at = index.min(children.len());
                    children.insert(at, child);
                }
            }
        }
        PatchOp::RemoveNode { node } => {
            detach(tree, app, node);
        }
        PatchOp::ReplaceChildren { parent, children } => {
            for &child in &children {
                detach(tree, app, child);
            }
            let parent_world = tree.node(parent).map_or(Vector::ZERO, Node::world_position);
            for &child in &children {
                let child_local = tree
                    .node(child)
                    .map_or(Vector::ZERO, Node::local_position);
                let delta = Vector::new(
                    parent_world.x - child_local.x,
                    parent_world.y - child_local.y,
                );
                shift_local(tree, child, delta);
            }
            if let Some(node) = tree.node_mut(parent) {
                if let Some(list) = node.children_mut() {
                    list.clear();
                    list.extend_from_slice(&children);
                }
            }
        }
        PatchOp::RequestFocus { node } => focus.push(FocusRequest::Focus(node)),
        PatchOp::ClearFocus => focus.push(FocusRequest::Clear),
        PatchOp::RequestClose => focus.push(FocusRequest::Close),
        PatchOp::SetVisibility { .. }
        | PatchOp::SetEnabled { .. }
        | PatchOp::SetValue { .. }
        | PatchOp::SetProperty { .. } => {
            // Rejected during validation; never reaches application.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::StableId;
    use crate::node::{Children, RectNode, TextNode};

    fn push_rect(tree: &mut SceneTree, position: Vector, children: &[NodeId]) -> NodeId {
        let node = Node::Rect(RectNode {
            node_id: tree.next_node_id(),
            stable_id: StableId::NONE,
            declared_id: None,
            size: Vector::new(10, 10),
            position,
            local_position: Vector::ZERO,
            background: Some(Color::BLACK),
            children: Children::from_slice(children),
        });
        tree.push(node).unwrap()
    }

    fn push_text(tree: &mut SceneTree) -> NodeId {
        let node = Node::Text(TextNode {
            node_id: tree.next_node_id(),
            stable_id: StableId::NONE,
            declared_id: None,
            body: String::from("hi"),
            color: Color::WHITE,
            position: Vector::ZERO,
            local_position: Vector::ZERO,
            text_size: 12,
        });
        tree.push(node).unwrap()
    }

    fn app_with(children: &[NodeId]) -> App {
        App {
            id: String::from("test-app"),
            size: Vector::new(100, 100),
            position: Vector::ZERO,
            background: Color::BLACK,
            children: Children::from_slice(children),
        }
    }

    #[test]
    fn unknown_node_is_soft_rejected() {
        let mut tree = SceneTree::with_capacity(8);
        let rect = push_rect(&mut tree, Vector::ZERO, &[]);
        let mut app = app_with(&[rect]);
        let mut applier = PatchApplier::default();
        let result = applier
            .apply_batch(
                &mut tree,
                &mut app,
                vec![
                    PatchOp::SetBackground {
                        node: NodeId(99),
                        background: None,
                    },
                    PatchOp::SetPosition {
                        node: rect,
                        position: Vector::new(5, 5),
                    },
                ],
            )
            .unwrap();
        assert_eq!(result.applied, 1);
        assert_eq!(result.rejected.len(), 1);
        assert!(matches!(result.rejected[0].1, PatchError::UnknownNode(_)));
        assert_eq!(tree.node(rect).unwrap().position(), Vector::new(5, 5));
    }

    #[test]
    fn cross_app_mutation_is_rejected() {
        let mut tree = SceneTree::with_capacity(8);
        let mine = push_rect(&mut tree, Vector::ZERO, &[]);
        let theirs = push_rect(&mut tree, Vector::ZERO, &[]);
        let mut app = app_with(&[mine]);
        let mut applier = PatchApplier::default();
        let result = applier
            .apply_batch(
                &mut tree,
                &mut app,
                vec![PatchOp::SetPosition {
                    node: theirs,
                    position: Vector::new(1, 1),
                }],
            )
            .unwrap();
        assert!(matches!(
            result.rejected[0].1,
            PatchError::CrossAppMutation(_)
        ));
        assert_eq!(tree.node(theirs).unwrap().position(), Vector::ZERO);
    }

    #[test]
    fn structural_cycle_is_rejected() {
        let mut tree = SceneTree::with_capacity(8);
        let child = push_rect(&mut tree, Vector::ZERO, &[]);
        let parent = push_rect(&mut tree, Vector::ZERO, &[child]);
        let mut app = app_with(&[parent]);
        let mut applier = PatchApplier::default();
        let result = applier
            .apply_batch(
                &mut tree,
                &mut app,
                vec![PatchOp::InsertChild {
                    parent: child,
                    child: parent,
                    index: 0,
                }],
            )
            .unwrap();
        assert!(matches!(
            result.rejected[0].1,
            PatchError::StructuralCycle { .. }
        ));
    }

    #[test]
    fn set_position_shifts_descendant_locals() {
        let mut tree = SceneTree::with_capacity(8);
        let child = push_rect(&mut tree, Vector::new(3, 4), &[]);
        let parent = push_rect(&mut tree, Vector::new(10, 10), &[child]);
        // Parse-time accumulation for the child.
        if let Some(Node::Rect(rect)) = tree.node_mut(child) {
            rect.local_position = Vector::new(10, 10);
        }
        let mut app = app_with(&[parent]);
        let mut applier = PatchApplier::default();
        applier
            .apply_batch(
                &mut tree,
                &mut app,
                vec![PatchOp::SetPosition {
                    node: parent,
                    position: Vector::new(20, 20),
                }],
            )
            .unwrap();
        assert_eq!(
            tree.node(child).unwrap().world_position(),
            Vector::new(23, 24)
        );
    }

    #[test]
    fn unsupported_property_soft_fails() {
        let mut tree = SceneTree::with_capacity(8);
        let text = push_text(&mut tree);
        let mut app = app_with(&[text]);
        let mut applier = PatchApplier::default();
        let result = applier
            .apply_batch(
                &mut tree,
                &mut app,
                vec![PatchOp::SetVisibility {
                    node: text,
                    visible: false,
                }],
            )
            .unwrap();
        assert!(matches!(
            result.rejected[0].1,
            PatchError::UnsupportedProperty { .. }
        ));
    }

    #[test]
    fn repeat_violations_terminate_session() {
        let mut tree = SceneTree::with_capacity(8);
        let rect = push_rect(&mut tree, Vector::ZERO, &[]);
        let mut app = app_with(&[rect]);
        let mut applier = PatchApplier::new(PatchPolicy {
            hard_fail_threshold: 2,
        });
        let bad = || PatchOp::RemoveNode { node: NodeId(99) };
        assert!(applier
            .apply_batch(&mut tree, &mut app, vec![bad()])
            .is_ok());
        let err = applier
            .apply_batch(&mut tree, &mut app, vec![bad()])
            .unwrap_err();
        assert_eq!(err.violations, 2);
    }

    #[test]
    fn batch_order_is_preserved() {
        let mut tree = SceneTree::with_capacity(8);
        let text = push_text(&mut tree);
        let mut app = app_with(&[text]);
        let mut applier = PatchApplier::default();
        let result = applier
            .apply_batch(
                &mut tree,
                &mut app,
                vec![
                    PatchOp::SetText {
                        node: text,
                        body: String::from("first"),
                    },
                    PatchOp::SetText {
                        node: text,
                        body: String::from("second"),
                    },
                ],
            )
            .unwrap();
        assert_eq!(result.applied, 2);
        match tree.node(text) {
            Some(Node::Text(t)) => assert_eq!(t.body, "second"),
            _ => panic!("text node missing"),
        }
    }
}
