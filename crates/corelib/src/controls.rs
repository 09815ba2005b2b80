//! Damped orbit controls.
//!
//! Pointer input only accumulates pending rotation/zoom. Each call to
//! [`OrbitControls::update`] applies a `damping` fraction of what is pending
//! and keeps the rest for later frames, so the camera eases toward the
//! requested orbit instead of jumping to it.

use std::f32::consts::{PI, TAU};

use crate::Vec3;
use crate::camera::Camera;

/// Anything that moves the camera once per frame.
pub trait CameraController {
    /// Advance one step. Returns `true` if the camera moved.
    fn update(&mut self, camera: &mut Camera) -> bool;
}

/// Default share of the pending motion applied per update.
pub const DEFAULT_DAMPING: f32 = 0.05;

/// Keeps the polar angle off the poles so `look_at` stays well defined.
const POLE_EPS: f32 = 1e-4;
const MOVE_EPS: f32 = 1e-6;
/// Orbit radius bounds. At zero the eye sits on the target and the orbit
/// direction is lost; past the upper bound the eye overflows.
const MIN_RADIUS: f32 = 1e-3;
const MAX_RADIUS: f32 = 1e6;

/// Spherical coordinates around the +Y axis.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around +Y, measured from +Z toward +X.
    theta: f32,
}

impl Spherical {
    fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
            theta: v.x.atan2(v.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_r = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_r * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_r * self.theta.cos(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    /// Fraction of pending motion applied per update, in (0, 1].
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pending_theta: f32,
    pending_phi: f32,
    /// Pending zoom as a log-scale factor on the orbit radius.
    pending_zoom: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: true,
            damping: DEFAULT_DAMPING,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_zoom: 0.0,
        }
    }

    /// Queue a rotation for a pointer drag of (`dx`, `dy`) pixels. A drag across
    /// the full viewport height turns the camera once around the target.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        self.pending_theta -= TAU * dx / viewport_height * self.rotate_speed;
        self.pending_phi -= TAU * dy / viewport_height * self.rotate_speed;
    }

    /// Queue a zoom; positive `steps` move the camera toward the target.
    pub fn zoom(&mut self, steps: f32) {
        self.pending_zoom += steps * 0.95f32.ln() * self.zoom_speed;
    }

    /// True while damped motion is still being applied.
    pub fn is_settling(&self) -> bool {
        self.pending_theta.abs() > MOVE_EPS
            || self.pending_phi.abs() > MOVE_EPS
            || self.pending_zoom.abs() > MOVE_EPS
    }

    fn step_factor(&self) -> f32 {
        if self.enable_damping {
            self.damping.clamp(f32::EPSILON, 1.0)
        } else {
            1.0
        }
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl CameraController for OrbitControls {
    fn update(&mut self, camera: &mut Camera) -> bool {
        let k = self.step_factor();
        let before = camera.eye;

        let mut s = Spherical::from_offset(camera.eye - self.target);
        s.theta += self.pending_theta * k;
        s.phi = (s.phi + self.pending_phi * k).clamp(POLE_EPS, PI - POLE_EPS);
        s.radius = (s.radius * (self.pending_zoom * k).exp())
            .min(self.max_distance.min(MAX_RADIUS))
            .max(self.min_distance.max(MIN_RADIUS));

        camera.eye = self.target + s.to_offset();
        camera.target = self.target;

        let keep = 1.0 - k;
        self.pending_theta *= keep;
        self.pending_phi *= keep;
        self.pending_zoom *= keep;

        camera.eye.distance_squared(before) > MOVE_EPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azimuth(camera: &Camera) -> f32 {
        Spherical::from_offset(camera.eye - camera.target).theta
    }

    #[test]
    fn spherical_round_trip_of_viewer_eye() {
        let v = crate::camera::VIEWER_EYE;
        let back = Spherical::from_offset(v).to_offset();
        assert!(back.distance(v) < 1e-5);
    }

    #[test]
    fn idle_update_keeps_camera_still() {
        let mut cam = Camera::viewer_default(1.5);
        let mut controls = OrbitControls::default();
        assert!(!controls.update(&mut cam));
        assert!(cam.eye.distance(crate::camera::VIEWER_EYE) < 1e-5);
    }

    #[test]
    fn damped_rotation_eases_in() {
        let mut cam = Camera::viewer_default(1.5);
        let mut controls = OrbitControls::default();
        let start = azimuth(&cam);

        // A quarter of the viewport height -> a quarter turn requested.
        controls.rotate(-100.0, 0.0, 400.0);
        let requested = TAU * 0.25;

        assert!(controls.update(&mut cam));
        let first = azimuth(&cam) - start;
        assert!((first - requested * DEFAULT_DAMPING).abs() < 1e-4);

        for _ in 0..400 {
            controls.update(&mut cam);
        }
        let total = azimuth(&cam) - start;
        assert!((total - requested).abs() < 1e-3, "total={total}");
        assert!(!controls.is_settling());
    }

    #[test]
    fn undamped_rotation_is_applied_at_once() {
        let mut cam = Camera::viewer_default(1.5);
        let mut controls = OrbitControls {
            enable_damping: false,
            ..OrbitControls::default()
        };
        let start = azimuth(&cam);
        controls.rotate(-40.0, 0.0, 400.0);
        controls.update(&mut cam);
        assert!((azimuth(&cam) - start - TAU * 0.1).abs() < 1e-4);
        assert!(!controls.is_settling());
    }

    #[test]
    fn zoom_keeps_radius_within_limits() {
        let mut cam = Camera::viewer_default(1.5);
        let mut controls = OrbitControls {
            min_distance: 4.0,
            max_distance: 10.0,
            ..OrbitControls::default()
        };
        controls.zoom(500.0);
        for _ in 0..200 {
            controls.update(&mut cam);
        }
        assert!((cam.eye.length() - 4.0).abs() < 1e-4);

        controls.zoom(-2000.0);
        for _ in 0..200 {
            controls.update(&mut cam);
        }
        assert!((cam.eye.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn deep_zoom_in_can_be_undone() {
        let mut cam = Camera::viewer_default(1.5);
        let mut controls = OrbitControls::default();
        for _ in 0..200 {
            controls.zoom(40.0);
            controls.update(&mut cam);
        }
        let closest = cam.eye.distance(cam.target);
        assert!(closest >= MIN_RADIUS * 0.999, "radius={closest}");
        assert!(cam.view().to_cols_array().iter().all(|f| f.is_finite()));

        for _ in 0..200 {
            controls.zoom(-40.0);
            controls.update(&mut cam);
        }
        let farthest = cam.eye.distance(cam.target);
        assert!(farthest > closest && farthest <= MAX_RADIUS * 1.001);
        assert!(cam.proj_view().to_cols_array().iter().all(|f| f.is_finite()));
    }

    #[test]
    fn polar_angle_never_reaches_the_pole() {
        let mut cam = Camera::viewer_default(1.5);
        let mut controls = OrbitControls::default();
        controls.rotate(0.0, 10_000.0, 100.0);
        for _ in 0..300 {
            controls.update(&mut cam);
        }
        assert!(cam.eye.y > 0.0);
        assert!(glam::Vec2::new(cam.eye.x, cam.eye.z).length() > 0.0);
        assert!(cam.view().to_cols_array().iter().all(|f| f.is_finite()));
    }
}
