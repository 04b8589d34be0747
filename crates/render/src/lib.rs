//! Render IR and tile scheduler for the Swen compositor.
//!
//! Lowers the retained scene tree into an incremental, GPU-friendly
//! representation:
//!
//! ```text
//! SceneTree ── lower_desktop ──► IRBuffer ── TileScheduler ──► FrameSnapshot ──► Backend
//! ```
//!
//! - [`ir`] — the ordered instruction stream and its bounded buffer.
//! - [`lower`] — scene-tree traversal emitting world-coordinate draws.
//! - [`tile`] — tile records, coordinates, and frame statistics.
//! - [`paint_table`] — linear-probed paint/clip deduplication.
//! - [`scheduler`] — the bin → sort → merge → classify pipeline.
//! - [`snapshot`] — the immutable per-frame view backends consume.
//! - [`gpu`] — `repr(C)` packed records for SSBO upload.
//! - [`backend`] — the backend trait, capabilities, and a null test double.
//! - [`renderer`] — `Renderer<B>` tying the pipeline together.

pub mod backend;
pub mod error;
pub mod gpu;
pub mod ir;
pub mod lower;
pub mod paint_table;
pub mod scheduler;
pub mod snapshot;
pub mod tile;

pub mod renderer;

pub use backend::{BoxedBackend, Capabilities, FrameResult, NullBackend, RenderBackend};
pub use error::FrameError;
pub use gpu::{pack_segments, pack_tile_work, GPUSegment, GPUTileWork};
pub use ir::{
    ClipKey, IRBuffer, IRError, IRInstruction, PaintKey, TextRef, INLINE_TEXT_CAP,
    MAX_CLIP_DEPTH, MAX_IR_INSTRUCTIONS,
};
pub use lower::lower_desktop;
pub use paint_table::{ClipTable, DedupTable, PaintTable, TableOverflow, MAX_CLIPS, MAX_PAINTS};
pub use renderer::Renderer;
pub use scheduler::{ScheduleError, TileScheduler};
pub use snapshot::FrameSnapshot;
pub use tile::{
    DirtyRegion, FrameStats, Segment, TileClassification, TileCoord, TileWork,
    MAX_DIRTY_REGIONS, MAX_SEGMENTS_PER_FRAME, MAX_TILES_PER_FRAME, TILE_SIZE,
};
