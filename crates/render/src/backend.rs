//! Rendering backend abstraction.
//!
//! Backends consume immutable [`FrameSnapshot`]s and turn them into GPU (or
//! software) work. The trait is object-safe: `Box<dyn RenderBackend>` is
//! the runtime-polymorphic handle, while [`crate::renderer::Renderer`]
//! provides the compile-time-polymorphic wrapper. Teardown maps to `Drop`.

use anyhow::Result as AnyResult;
use serde::{Deserialize, Serialize};

use crate::snapshot::FrameSnapshot;

/// Self-reported backend capabilities. The core never assumes any of them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub tile_rendering: bool,
    pub incremental_update: bool,
    pub compute_shaders: bool,
    pub tile_caching: bool,
    pub hardware_clip: bool,
}

/// Per-submission metrics reported back to the host.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FrameResult {
    pub submit_time_ns: u64,
    pub gpu_time_ns: u64,
    pub draw_calls: u32,
    pub tiles_rendered: u32,
    pub tiles_cached: u32,
    pub gpu_memory_bytes: u64,
}

/// Backend-agnostic rendering interface.
pub trait RenderBackend {
    /// Submit a frame snapshot for rendering.
    ///
    /// The snapshot's slices stay valid until the scheduler that built it
    /// is reset; submission must complete (or copy) before then.
    ///
    /// # Errors
    /// Returns an error if encoding or submission fails.
    fn submit(&mut self, snapshot: &FrameSnapshot<'_>) -> AnyResult<FrameResult>;

    /// Present the last submitted frame.
    ///
    /// # Errors
    /// Returns an error if presentation fails.
    fn present(&mut self) -> AnyResult<()>;

    /// Self-reported capabilities.
    fn capabilities(&self) -> Capabilities;

    /// Resize the backend's target surface.
    fn resize(&mut self, width: u32, height: u32);

    /// Drop any cached tiles or retained GPU state.
    fn invalidate_cache(&mut self);
}

impl<B: RenderBackend + ?Sized> RenderBackend for Box<B> {
    fn submit(&mut self, snapshot: &FrameSnapshot<'_>) -> AnyResult<FrameResult> {
        (**self).submit(snapshot)
    }

    fn present(&mut self) -> AnyResult<()> {
        (**self).present()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn resize(&mut self, width: u32, height: u32) {
        (**self).resize(width, height);
    }

    fn invalidate_cache(&mut self) {
        (**self).invalidate_cache();
    }
}

/// Runtime-polymorphic backend handle.
pub type BoxedBackend = Box<dyn RenderBackend + Send>;

/// A backend that renders nothing and reports accurate counts. Serves as
/// the host's fallback and as a test double.
#[derive(Debug, Default)]
pub struct NullBackend {
    width: u32,
    height: u32,
    frames_submitted: u64,
    cache_invalidations: u64,
}

impl NullBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    #[must_use]
    pub const fn cache_invalidations(&self) -> u64 {
        self.cache_invalidations
    }
}

impl RenderBackend for NullBackend {
    fn submit(&mut self, snapshot: &FrameSnapshot<'_>) -> AnyResult<FrameResult> {
        let started = std::time::Instant::now();
        self.frames_submitted += 1;
        let tile_bytes = snapshot.tile_work.len() * core::mem::size_of::<crate::gpu::GPUTileWork>();
        Ok(FrameResult {
            submit_time_ns: started.elapsed().as_nanos() as u64,
            gpu_time_ns: 0,
            draw_calls: snapshot.draw_count(),
            tiles_rendered: snapshot.tile_work.len() as u32,
            tiles_cached: 0,
            gpu_memory_bytes: tile_bytes as u64,
        })
    }

    fn present(&mut self) -> AnyResult<()> {
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            tile_rendering: true,
            ..Capabilities::default()
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn invalidate_cache(&mut self) {
        self.cache_invalidations += 1;
    }
}
