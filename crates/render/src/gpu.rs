//! GPU-packed tile records for SSBO upload.
//!
//! Mirrors of [`TileWork`] and [`Segment`] with explicit `repr(C)` layout
//! and padding at natural alignment, castable to bytes with `bytemuck`.

use bytemuck::{Pod, Zeroable};

use crate::tile::{Segment, TileWork};

/// `TileWork` in upload layout. 24 bytes, 4-byte aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct GPUTileWork {
    pub coord_x: u16,
    pub coord_y: u16,
    pub classification: u8,
    pub _pad: [u8; 3],
    pub solid_color: [u8; 4],
    pub segment_start: u32,
    pub segment_count: u16,
    pub clip_index: u16,
    pub paint_index: u16,
    pub z_order: u16,
}

impl From<&TileWork> for GPUTileWork {
    fn from(work: &TileWork) -> Self {
        Self {
            coord_x: work.coord.x,
            coord_y: work.coord.y,
            classification: work.classification as u8,
            _pad: [0; 3],
            solid_color: [
                work.solid_color.r,
                work.solid_color.g,
                work.solid_color.b,
                work.solid_color.a,
            ],
            segment_start: work.segment_start,
            segment_count: work.segment_count,
            clip_index: work.clip_index,
            paint_index: work.paint_index,
            z_order: work.z_order,
        }
    }
}

/// `Segment` in upload layout. 12 bytes, 2-byte aligned padded to 4.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct GPUSegment {
    pub x0: i16,
    pub y0: i16,
    pub x1: i16,
    pub y1: i16,
    pub winding: i8,
    pub _pad: [u8; 3],
}

impl From<&Segment> for GPUSegment {
    fn from(segment: &Segment) -> Self {
        Self {
            x0: segment.x0,
            y0: segment.y0,
            x1: segment.x1,
            y1: segment.y1,
            winding: segment.winding,
            _pad: [0; 3],
        }
    }
}

/// Pack a frame's tile work for upload.
#[must_use]
pub fn pack_tile_work(work: &[TileWork]) -> Vec<GPUTileWork> {
    work.iter().map(GPUTileWork::from).collect()
}

/// Pack a frame's segments for upload.
#[must_use]
pub fn pack_segments(segments: &[Segment]) -> Vec<GPUSegment> {
    segments.iter().map(GPUSegment::from).collect()
}

/// Raw bytes of packed tile work, ready for a buffer write.
#[must_use]
pub fn tile_work_bytes(work: &[GPUTileWork]) -> &[u8] {
    bytemuck::cast_slice(work)
}

/// Raw bytes of packed segments.
#[must_use]
pub fn segment_bytes(segments: &[GPUSegment]) -> &[u8] {
    bytemuck::cast_slice(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{TileClassification, TileCoord};
    use swen_scene::Color;

    #[test]
    fn layouts_have_no_implicit_padding() {
        assert_eq!(core::mem::size_of::<GPUTileWork>(), 24);
        assert_eq!(core::mem::align_of::<GPUTileWork>(), 4);
        assert_eq!(core::mem::size_of::<GPUSegment>(), 12);
    }

    #[test]
    fn tile_work_round_trips_fields() {
        let work = TileWork {
            coord: TileCoord::new(3, 7),
            classification: TileClassification::Edge,
            solid_color: Color::new(1, 2, 3, 4),
            segment_start: 9,
            segment_count: 2,
            clip_index: 0,
            paint_index: 5,
            z_order: 11,
        };
        let gpu = GPUTileWork::from(&work);
        assert_eq!(gpu.coord_x, 3);
        assert_eq!(gpu.coord_y, 7);
        assert_eq!(gpu.classification, 1);
        assert_eq!(gpu.solid_color, [1, 2, 3, 4]);
        assert_eq!(gpu.paint_index, 5);
        let bytes = tile_work_bytes(core::slice::from_ref(&gpu));
        assert_eq!(bytes.len(), 24);
    }
}
