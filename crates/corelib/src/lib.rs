//! Core viewer logic: camera rig, viewport, material binding, viewer context
//! and the frame loop. Renderer-agnostic; the GPU side plugs in through
//! [`context::RenderTarget`].

pub use glam::{Mat4, Vec3, vec3};

pub mod binding;
pub mod camera;
pub mod clock;
pub mod context;
pub mod controls;
pub mod error;
pub mod frame_loop;
pub mod pipeline;
pub mod viewport;

pub use binding::{BindError, BindingTable, NodeIndex, bind};
pub use camera::Camera;
pub use context::{RenderTarget, ViewerContext};
pub use controls::{CameraController, OrbitControls};
pub use error::{ViewerError, ViewerResult};
pub use frame_loop::{CancelToken, FrameLoop, FrameStatus};
pub use pipeline::{ScenePaths, load_bound_scene};
pub use viewport::{MAX_PIXEL_RATIO, Viewport};
