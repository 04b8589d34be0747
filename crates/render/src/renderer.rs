//! The compile-time-polymorphic pipeline driver.

use swen_scene::{Bounds, NodeId, SceneTree};

use crate::backend::{FrameResult, RenderBackend};
use crate::error::FrameError;
use crate::ir::IRBuffer;
use crate::lower::lower_desktop;
use crate::scheduler::TileScheduler;

/// Owns a backend of static type `B` plus the frame's IR buffer and tile
/// scheduler, and runs lowering → scheduling → submission per frame.
#[derive(Debug)]
pub struct Renderer<B: RenderBackend> {
    backend: B,
    ir: IRBuffer,
    scheduler: TileScheduler,
}

impl<B: RenderBackend> Renderer<B> {
    #[must_use]
    pub fn new(backend: B, viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            backend,
            ir: IRBuffer::new(),
            scheduler: TileScheduler::new(viewport_width, viewport_height),
        }
    }

    /// Render the tree's desktop as one frame.
    ///
    /// `render_desktop` is a pure function of the current scene tree plus
    /// the internal frame counter; the host's event loop alternates it with
    /// event pumping.
    ///
    /// # Errors
    /// Lowering and scheduling errors drop the frame; backend errors are
    /// propagated from submission.
    pub fn render_desktop(&mut self, tree: &SceneTree) -> Result<FrameResult, FrameError> {
        lower_desktop(tree, &mut self.ir)?;
        self.scheduler.schedule(&self.ir)?;
        let snapshot = self.scheduler.build_snapshot(&self.ir);
        let result = self.backend.submit(&snapshot).map_err(FrameError::Backend)?;
        self.backend.present().map_err(FrameError::Backend)?;
        Ok(result)
    }

    /// Record a changed region for the next frame's backend hints.
    pub fn mark_dirty(&mut self, bounds: Bounds, source_node: NodeId) {
        let frame = self.ir.frame_number();
        self.scheduler.mark_dirty(bounds, source_node, frame);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.scheduler.resize(width, height);
        self.backend.resize(width, height);
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[must_use]
    pub fn ir(&self) -> &IRBuffer {
        &self.ir
    }

    #[must_use]
    pub fn scheduler(&self) -> &TileScheduler {
        &self.scheduler
    }

    /// Tear down into the backend, e.g. to hand it to another pipeline.
    #[must_use]
    pub fn into_backend(self) -> B {
        self.backend
    }
}
