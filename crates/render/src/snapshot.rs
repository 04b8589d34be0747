//! The immutable per-frame view handed to a backend.

use crate::ir::{ClipKey, IRInstruction, PaintKey};
use crate::tile::{DirtyRegion, FrameStats, Segment, TileWork};

/// Borrowed slices over the scheduler's and IR buffer's arenas, plus the
/// frame's statistics. Valid until the owning scheduler is reset or
/// rescheduled; a backend must finish submission (or copy) before the next
/// frame begins.
#[derive(Debug, Clone, Copy)]
pub struct FrameSnapshot<'a> {
    pub frame_number: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub instructions: &'a [IRInstruction],
    pub tile_work: &'a [TileWork],
    pub segments: &'a [Segment],
    pub paint_table: &'a [PaintKey],
    pub clip_table: &'a [ClipKey],
    pub dirty_regions: &'a [DirtyRegion],
    pub stats: FrameStats,
}

impl FrameSnapshot<'_> {
    /// Number of geometry-producing instructions in the frame.
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        self.instructions
            .iter()
            .filter(|instruction| instruction.is_draw())
            .count() as u32
    }
}
