use crate::{Mat4, Vec3, vec3};

/// Vertical field of view of the viewer camera, in degrees.
pub const VIEWER_FOV_Y_DEG: f32 = 45.0;
pub const VIEWER_Z_NEAR: f32 = 0.1;
pub const VIEWER_Z_FAR: f32 = 125.0;
/// Initial eye position of the viewer camera.
pub const VIEWER_EYE: Vec3 = vec3(-5.0, 2.0, 6.0);

/// Simple perspective camera (right-handed).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    /// The viewer's fixed camera, looking at the origin.
    pub fn viewer_default(aspect: f32) -> Self {
        Self::new_perspective(
            VIEWER_EYE,
            Vec3::ZERO,
            Vec3::Y,
            VIEWER_FOV_Y_DEG.to_radians(),
            VIEWER_Z_NEAR,
            VIEWER_Z_FAR,
            aspect,
        )
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Depth in [0, 1], matching wgpu clip space.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    /// Replace the aspect ratio. Non-finite or non-positive values are ignored
    /// and `false` is returned.
    pub fn set_aspect(&mut self, aspect: f32) -> bool {
        if !aspect.is_finite() || aspect <= 0.0 {
            return false;
        }
        self.aspect = aspect;
        true
    }
}
