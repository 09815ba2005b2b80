//! Logical viewport size and device pixel ratio.

/// Upper bound on the pixel ratio used for the render target.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        self.width = width;
        self.height = height;
        self.device_pixel_ratio = device_pixel_ratio;
    }

    /// `width / height`, or `None` while either dimension is zero.
    pub fn aspect(&self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(self.width as f32 / self.height as f32)
    }

    /// Device pixel ratio capped at [`MAX_PIXEL_RATIO`].
    pub fn pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio.min(MAX_PIXEL_RATIO).max(0.0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.aspect().is_none()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720, 1.0)
    }
}
