//! Scene-tree data model for the Swen compositor.
//!
//! Apps declare their UI as a retained tree of nodes; the compositor owns the
//! global scene. This crate provides the building blocks the rest of the core
//! relies on:
//!
//! - [`geometry`] — `Vector`, `Color`, `Matrix`, `Bounds` value types.
//! - [`id`] — dense per-parse [`NodeId`]s and djb2-derived [`StableId`]s.
//! - [`arena`] — bounded fixed-capacity storage; overflow is a typed error.
//! - [`node`] — the polymorphic [`Node`] model and the [`SceneTree`] that
//!   owns it, rooted at `Root { desktop, system }`.
//! - [`filter`] — root filtering over flat arena ranges, preserving tree
//!   purity without parent pointers.
//! - [`patch`] — validation and application of app-issued patch-op batches.

pub mod arena;
pub mod filter;
pub mod geometry;
pub mod id;
pub mod node;
pub mod patch;

pub use arena::{Arena, ArenaOverflow};
pub use filter::{root_filter, FilterError, PresenceBitset, DEFAULT_ROOT_FILTER_CAPACITY};
pub use geometry::{Bounds, Color, Matrix, Vector};
pub use id::{NodeId, StableId};
pub use node::{
    App, Children, Desktop, Node, RectNode, Root, SceneTree, System, TextNode, TransformNode,
    Workspace, DEFAULT_NODE_CAPACITY,
};
pub use patch::{
    BatchResult, FocusRequest, PatchApplier, PatchError, PatchOp, PatchPolicy, SessionTerminated,
};
