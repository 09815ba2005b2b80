//! Pointer input -> orbit controls.

use corelib::OrbitControls;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Pixels of trackpad scroll that count as one wheel step.
const PIXELS_PER_STEP: f64 = 50.0;

/// Tracks left-button drags and wheel motion and feeds them to the controls.
#[derive(Debug, Default)]
pub struct PointerTracker {
    dragging: bool,
    last: Option<(f64, f64)>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        self.dragging = state == ElementState::Pressed;
        if !self.dragging {
            self.last = None;
        }
    }

    /// Cursor moved to `(x, y)` (physical pixels).
    pub fn moved(&mut self, x: f64, y: f64, viewport_height: f32, controls: &mut OrbitControls) {
        if self.dragging {
            if let Some((lx, ly)) = self.last {
                controls.rotate((x - lx) as f32, (y - ly) as f32, viewport_height);
            }
        }
        self.last = Some((x, y));
    }

    pub fn left(&mut self) {
        self.last = None;
    }

    pub fn wheel(&mut self, delta: MouseScrollDelta, controls: &mut OrbitControls) {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y as f64,
            MouseScrollDelta::PixelDelta(p) => p.y / PIXELS_PER_STEP,
        };
        controls.zoom(steps as f32);
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}
