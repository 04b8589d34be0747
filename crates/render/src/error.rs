//! Frame-level error aggregation.

use core::fmt;

use crate::ir::IRError;
use crate::scheduler::ScheduleError;

/// Everything that can abort one frame of `render_desktop`.
#[derive(Debug)]
pub enum FrameError {
    Lowering(IRError),
    Schedule(ScheduleError),
    Backend(anyhow::Error),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lowering(err) => write!(f, "lowering failed: {err}"),
            Self::Schedule(err) => write!(f, "tile scheduling failed: {err}"),
            Self::Backend(err) => write!(f, "backend submission failed: {err}"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Lowering(err) => Some(err),
            Self::Schedule(err) => Some(err),
            Self::Backend(err) => Some(err.as_ref()),
        }
    }
}

impl From<IRError> for FrameError {
    fn from(err: IRError) -> Self {
        Self::Lowering(err)
    }
}

impl From<ScheduleError> for FrameError {
    fn from(err: ScheduleError) -> Self {
        Self::Schedule(err)
    }
}
