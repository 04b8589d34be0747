//! The tile scheduler: bin → sort → merge → classify.
//!
//! Transforms a frame's IR into per-tile GPU work records. Scheduling runs
//! four ordered phases over bounded arenas:
//!
//! 1. **Bin** — each draw instruction is expanded into the inclusive tile
//!    rectangle its bounds touch; paints deduplicate through a linear-probed
//!    table.
//! 2. **Sort** — stable sort by `(coord.pack(), z_order)` for cache-coherent
//!    GPU access order.
//! 3. **Merge** — an opaque solid tile occludes an earlier solid record at
//!    the same coordinate; everything else is preserved.
//! 4. **Classify** — per-classification counts snapshot into [`FrameStats`].
//!
//! State, clip, and cache-hint instructions are ignored by binning in this
//! version; `TileWork.clip_index` stays zero.

use core::fmt;

use swen_scene::{Bounds, NodeId};

use crate::ir::{IRBuffer, IRInstruction};
use crate::paint_table::{ClipTable, PaintTable, MAX_CLIPS, MAX_PAINTS};
use crate::snapshot::FrameSnapshot;
use crate::tile::{
    DirtyRegion, FrameStats, Segment, TileClassification, TileCoord, TileWork,
    MAX_DIRTY_REGIONS, MAX_TILES_PER_FRAME, TILE_SIZE,
};

/// Errors that abort scheduling for the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    TileBufferOverflow { capacity: usize },
    PaintTableOverflow { capacity: usize },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TileBufferOverflow { capacity } => {
                write!(f, "tile work capacity {capacity} exhausted")
            }
            Self::PaintTableOverflow { capacity } => {
                write!(f, "paint table capacity {capacity} exhausted")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Owns the frame's tile-work arenas and runs the four phases.
#[derive(Debug)]
pub struct TileScheduler {
    tile_work: Vec<TileWork>,
    segments: Vec<Segment>,
    paint_table: PaintTable,
    clip_table: ClipTable,
    dirty_regions: Vec<DirtyRegion>,
    viewport_width: u32,
    viewport_height: u32,
    frame_number: u64,
    stats: FrameStats,
}

impl TileScheduler {
    #[must_use]
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            tile_work: Vec::new(),
            segments: Vec::new(),
            paint_table: PaintTable::with_capacity(MAX_PAINTS),
            clip_table: ClipTable::with_capacity(MAX_CLIPS),
            dirty_regions: Vec::new(),
            viewport_width,
            viewport_height,
            frame_number: 0,
            stats: FrameStats::default(),
        }
    }

    /// Drop all per-frame work. Outstanding [`FrameSnapshot`]s become
    /// invalid.
    pub fn reset(&mut self) {
        self.tile_work.clear();
        self.segments.clear();
        self.paint_table.clear();
        self.clip_table.clear();
        self.stats = FrameStats::default();
    }

    pub fn resize(&mut self, viewport_width: u32, viewport_height: u32) {
        self.viewport_width = viewport_width;
        self.viewport_height = viewport_height;
    }

    #[must_use]
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }

    #[must_use]
    pub fn tile_work(&self) -> &[TileWork] {
        &self.tile_work
    }

    /// Run all four phases over a frame's IR.
    ///
    /// # Errors
    /// Fatal for the frame. Backends may submit what a previous frame built,
    /// reset, and continue with chunked input instead.
    pub fn schedule(&mut self, ir: &IRBuffer) -> Result<(), ScheduleError> {
        self.reset();
        self.frame_number = ir.frame_number();
        self.bin(ir)?;
        self.sort();
        self.merge();
        self.classify();
        log::trace!(
            target: "swen_render",
            "frame {}: {} tiles ({} solid, {} edge)",
            self.frame_number,
            self.stats.tile_count,
            self.stats.solid_tiles,
            self.stats.edge_tiles
        );
        Ok(())
    }

    /// Phase 1: expand draw instructions into tile-work records.
    fn bin(&mut self, ir: &IRBuffer) -> Result<(), ScheduleError> {
        let mut draw_index: u32 = 0;
        for instruction in ir.instructions() {
            let (bounds, paint_key) = match instruction {
                IRInstruction::DrawRect {
                    bounds, paint_key, ..
                }
                | IRInstruction::DrawText {
                    bounds, paint_key, ..
                } => (*bounds, *paint_key),
                // State, clip, and cache instructions carry no geometry.
                _ => continue,
            };
            let z_order = (draw_index & 0xFFFF) as u16;
            draw_index += 1;

            if bounds.is_empty() || bounds.right() <= 0 || bounds.bottom() <= 0 {
                continue;
            }
            let paint_index = self
                .paint_table
                .intern(paint_key)
                .map_err(|overflow| ScheduleError::PaintTableOverflow {
                    capacity: overflow.capacity,
                })?;

            let start = TileCoord::from_pixel(bounds.x, bounds.y);
            let end = TileCoord::from_pixel(
                bounds.x + bounds.width - 1,
                bounds.y + bounds.height - 1,
            );
            for tile_y in start.y..=end.y {
                for tile_x in start.x..=end.x {
                    if self.tile_work.len() >= MAX_TILES_PER_FRAME {
                        return Err(ScheduleError::TileBufferOverflow {
                            capacity: MAX_TILES_PER_FRAME,
                        });
                    }
                    let coord = TileCoord::new(tile_x, tile_y);
                    self.tile_work.push(TileWork {
                        coord,
                        classification: classify_tile(bounds, coord),
                        solid_color: paint_key.color,
                        segment_start: 0,
                        segment_count: 0,
                        clip_index: 0,
                        paint_index,
                        z_order,
                    });
                }
            }
        }
        Ok(())
    }

    /// Phase 2: stable sort by packed coordinate, then draw order.
    fn sort(&mut self) {
        self.tile_work
            .sort_by_key(|work| (work.coord.pack(), work.z_order));
    }

    /// Phase 3: an opaque solid record occludes an earlier solid record at
    /// the same coordinate.
    fn merge(&mut self) {
        let mut kept = 0usize;
        for index in 0..self.tile_work.len() {
            let work = self.tile_work[index];
            if kept > 0 {
                let previous = self.tile_work[kept - 1];
                if previous.coord == work.coord
                    && previous.classification == TileClassification::Solid
                    && work.classification == TileClassification::Solid
                    && work.solid_color.is_opaque()
                {
                    self.tile_work[kept - 1] = work;
                    continue;
                }
            }
            self.tile_work[kept] = work;
            kept += 1;
        }
        self.tile_work.truncate(kept);
    }

    /// Phase 4: snapshot per-classification counts.
    fn classify(&mut self) {
        let mut stats = FrameStats {
            tile_count: self.tile_work.len() as u32,
            segment_count: self.segments.len() as u32,
            ..FrameStats::default()
        };
        for work in &self.tile_work {
            match work.classification {
                TileClassification::Solid => stats.solid_tiles += 1,
                TileClassification::Edge => stats.edge_tiles += 1,
            }
        }
        self.stats = stats;
    }

    /// Record a changed region. A hint, not a correctness invariant: past
    /// the bounded capacity additional marks are dropped.
    pub fn mark_dirty(&mut self, bounds: Bounds, source_node: NodeId, frame: u64) {
        if self.dirty_regions.len() >= MAX_DIRTY_REGIONS {
            log::debug!(
                target: "swen_render",
                "dirty region list full; dropping mark for {source_node}"
            );
            return;
        }
        self.dirty_regions.push(DirtyRegion {
            bounds,
            source_node,
            frame,
        });
    }

    pub fn clear_dirty(&mut self) {
        self.dirty_regions.clear();
    }

    #[must_use]
    pub fn dirty_regions(&self) -> &[DirtyRegion] {
        &self.dirty_regions
    }

    /// Immutable view over this frame's arenas, valid until the next
    /// [`Self::reset`] or [`Self::schedule`] call.
    #[must_use]
    pub fn build_snapshot<'a>(&'a self, ir: &'a IRBuffer) -> FrameSnapshot<'a> {
        FrameSnapshot {
            frame_number: self.frame_number,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            tiles_x: self.viewport_width.div_ceil(TILE_SIZE as u32),
            tiles_y: self.viewport_height.div_ceil(TILE_SIZE as u32),
            instructions: ir.instructions(),
            tile_work: &self.tile_work,
            segments: &self.segments,
            paint_table: self.paint_table.entries(),
            clip_table: self.clip_table.entries(),
            dirty_regions: &self.dirty_regions,
            stats: self.stats,
        }
    }
}

/// Solid when the primitive's bounds fully contain the tile.
fn classify_tile(bounds: Bounds, coord: TileCoord) -> TileClassification {
    let (tile_x, tile_y) = coord.origin();
    let solid = bounds.x <= tile_x
        && bounds.y <= tile_y
        && bounds.x + bounds.width >= tile_x + TILE_SIZE
        && bounds.y + bounds.height >= tile_y + TILE_SIZE;
    if solid {
        TileClassification::Solid
    } else {
        TileClassification::Edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PaintKey;
    use swen_scene::Color;

    fn ir_with_rect(bounds: Bounds, color: Color) -> IRBuffer {
        let mut ir = IRBuffer::new();
        ir.next_frame();
        ir.draw_rect(NodeId(1), bounds, PaintKey::solid(color), 0)
            .unwrap();
        ir
    }

    #[test]
    fn aligned_rect_is_one_solid_tile() {
        let ir = ir_with_rect(Bounds::new(0, 0, 16, 16), Color::new(255, 0, 0, 255));
        let mut scheduler = TileScheduler::new(64, 64);
        scheduler.schedule(&ir).unwrap();
        let work = scheduler.tile_work();
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].coord, TileCoord::new(0, 0));
        assert_eq!(work[0].classification, TileClassification::Solid);
    }

    #[test]
    fn straddling_rect_is_edge_classified() {
        let ir = ir_with_rect(Bounds::new(8, 8, 16, 16), Color::new(255, 0, 0, 255));
        let mut scheduler = TileScheduler::new(64, 64);
        scheduler.schedule(&ir).unwrap();
        assert_eq!(scheduler.tile_work().len(), 4);
        assert!(scheduler
            .tile_work()
            .iter()
            .all(|w| w.classification == TileClassification::Edge));
    }

    #[test]
    fn offscreen_rect_bins_nothing() {
        let ir = ir_with_rect(Bounds::new(-64, -64, 16, 16), Color::new(255, 0, 0, 255));
        let mut scheduler = TileScheduler::new(64, 64);
        scheduler.schedule(&ir).unwrap();
        assert!(scheduler.tile_work().is_empty());
    }

    #[test]
    fn dirty_marks_are_bounded() {
        let mut scheduler = TileScheduler::new(64, 64);
        for i in 0..(MAX_DIRTY_REGIONS + 10) {
            scheduler.mark_dirty(Bounds::new(0, 0, 1, 1), NodeId(i as u64 + 1), 1);
        }
        assert_eq!(scheduler.dirty_regions().len(), MAX_DIRTY_REGIONS);
    }
}
