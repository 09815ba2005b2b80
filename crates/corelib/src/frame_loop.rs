//! Frame loop: one `tick` per host frame callback, stopped through a
//! shared cancellation token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::clock::Clock;
use crate::context::{RenderTarget, ViewerContext};
use crate::controls::CameraController;

/// Shared stop flag. Clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Whether the host should schedule another frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Continue,
    Cancelled,
}

pub struct FrameLoop {
    clock: Clock,
    cancel: CancelToken,
    frames: u64,
    elapsed: f32,
}

impl FrameLoop {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            clock: Clock::new(),
            cancel,
            frames: 0,
            elapsed: 0.0,
        }
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Clock reading taken at the start of the last frame, in seconds.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// One frame: read the clock, advance the controller, draw.
    pub fn tick<T, C>(&mut self, ctx: &mut ViewerContext<T, C>) -> Result<FrameStatus, T::Error>
    where
        T: RenderTarget,
        C: CameraController,
    {
        if self.cancel.is_cancelled() {
            return Ok(FrameStatus::Cancelled);
        }

        self.elapsed = self.clock.elapsed_time();
        ctx.controls.update(&mut ctx.camera);
        ctx.target.render(&ctx.scene, &ctx.camera)?;
        self.frames += 1;

        if self.cancel.is_cancelled() {
            Ok(FrameStatus::Cancelled)
        } else {
            Ok(FrameStatus::Continue)
        }
    }
}
