//! Viewer context: everything one viewer instance owns, passed around
//! explicitly instead of living in globals.

use asset::SceneGraph;

use crate::camera::Camera;
use crate::controls::{CameraController, OrbitControls};
use crate::error::{ViewerError, ViewerResult};
use crate::viewport::Viewport;

/// Drawable surface supplied by the host.
pub trait RenderTarget {
    type Error;

    /// Logical size of the drawable area.
    fn set_size(&mut self, width: u32, height: u32);

    /// Pixel ratio to render at (already capped by the caller).
    fn set_pixel_ratio(&mut self, ratio: f32);

    /// One-time upload of an attached scene.
    fn prepare(&mut self, scene: &SceneGraph);

    /// Draw `scene` through `camera`. An empty scene still presents a frame.
    fn render(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<(), Self::Error>;
}

pub struct ViewerContext<T, C = OrbitControls> {
    /// Root container; empty until a loaded scene is attached.
    pub scene: SceneGraph,
    pub camera: Camera,
    pub controls: C,
    pub viewport: Viewport,
    pub target: T,
    attached: bool,
}

impl<T: RenderTarget> ViewerContext<T, OrbitControls> {
    /// Context with the viewer camera and orbit controls around the origin.
    pub fn new(target: T, viewport: Viewport) -> Self {
        Self::with_controls(target, OrbitControls::default(), viewport)
    }
}

impl<T: RenderTarget, C: CameraController> ViewerContext<T, C> {
    pub fn with_controls(mut target: T, controls: C, viewport: Viewport) -> Self {
        let camera = Camera::viewer_default(viewport.aspect().unwrap_or(1.0));
        if !viewport.is_empty() {
            target.set_size(viewport.width, viewport.height);
            target.set_pixel_ratio(viewport.pixel_ratio());
        }
        Self {
            scene: SceneGraph::new(),
            camera,
            controls,
            viewport,
            target,
            attached: false,
        }
    }

    /// Host resize. A zero dimension only records the new size; projection
    /// and render target keep their last valid state.
    pub fn on_resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        self.viewport.resize(width, height, device_pixel_ratio);

        let Some(aspect) = self.viewport.aspect() else {
            log::debug!("Ignoring degenerate viewport {}x{}", width, height);
            return;
        };
        self.camera.set_aspect(aspect);
        self.target.set_size(width, height);
        self.target.set_pixel_ratio(self.viewport.pixel_ratio());
        log::debug!(
            "Viewport {}x{} @{:.2} (aspect {:.4})",
            width,
            height,
            self.viewport.pixel_ratio(),
            aspect
        );
    }

    /// Attach a bound scene to the root container. Allowed once per context.
    pub fn attach(&mut self, scene: SceneGraph) -> ViewerResult<()> {
        if self.attached {
            return Err(ViewerError::AlreadyAttached);
        }
        self.scene.append(scene);
        self.target.prepare(&self.scene);
        self.attached = true;
        log::info!("Scene attached: {} nodes", self.scene.len());
        Ok(())
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use asset::{MaterialDescriptor, MeshData, Node};

    use super::*;
    use crate::binding::{BindingTable, bind};

    /// Render target that records what it was asked to do.
    #[derive(Default)]
    pub(crate) struct RecordingTarget {
        pub size: Option<(u32, u32)>,
        pub pixel_ratio: Option<f32>,
        pub prepared: usize,
        pub frames: Vec<usize>,
    }

    impl RenderTarget for RecordingTarget {
        type Error = std::convert::Infallible;

        fn set_size(&mut self, width: u32, height: u32) {
            self.size = Some((width, height));
        }

        fn set_pixel_ratio(&mut self, ratio: f32) {
            self.pixel_ratio = Some(ratio);
        }

        fn prepare(&mut self, _scene: &SceneGraph) {
            self.prepared += 1;
        }

        fn render(&mut self, scene: &SceneGraph, _camera: &Camera) -> Result<(), Self::Error> {
            self.frames.push(scene.len());
            Ok(())
        }
    }

    fn ctx(w: u32, h: u32, dpr: f32) -> ViewerContext<RecordingTarget> {
        ViewerContext::new(RecordingTarget::default(), Viewport::new(w, h, dpr))
    }

    #[test]
    fn resize_updates_aspect_exactly() {
        let mut c = ctx(800, 600, 1.0);
        for (w, h) in [(1600u32, 900u32), (1024, 768), (333, 777)] {
            c.on_resize(w, h, 1.0);
            assert_eq!(c.camera.aspect, w as f32 / h as f32);
        }
    }

    #[test]
    fn zero_size_keeps_previous_aspect() {
        let mut c = ctx(800, 600, 1.0);
        c.on_resize(0, 600, 1.0);
        assert_eq!(c.camera.aspect, 800.0 / 600.0);
        c.on_resize(800, 0, 1.0);
        assert_eq!(c.camera.aspect, 800.0 / 600.0);
        assert_eq!(c.target.size, Some((800, 600)));
        assert_eq!(c.viewport.width, 800);
        assert_eq!(c.viewport.height, 0);
        assert!(c.camera.proj().to_cols_array().iter().all(|f| f.is_finite()));
    }

    #[test]
    fn pixel_ratio_reaching_target_is_capped() {
        let mut c = ctx(800, 600, 1.0);
        for (dpr, expected) in [(0.0, 0.0), (1.0, 1.0), (1.25, 1.25), (2.0, 2.0), (3.0, 2.0)] {
            c.on_resize(800, 600, dpr);
            assert_eq!(c.target.pixel_ratio, Some(expected));
        }
    }

    #[test]
    fn host_resize_scenario() {
        let mut c = ctx(800, 600, 1.0);
        assert!((c.camera.aspect - 1.333_333).abs() < 1e-5);

        c.on_resize(1600, 900, 3.0);
        assert!((c.camera.aspect - 1.777_778).abs() < 1e-5);
        assert_eq!(c.target.size, Some((1600, 900)));
        assert_eq!(c.target.pixel_ratio, Some(2.0));
    }

    #[test]
    fn attach_scene_once() {
        let mut c = ctx(800, 600, 1.0);
        assert!(!c.is_attached());

        let mut loaded = SceneGraph::new();
        loaded.add_root(Node::new("A").with_mesh(MeshData::triangle()));
        loaded.add_root(Node::new("B").with_mesh(MeshData::triangle()));
        let x = MaterialDescriptor::emissive(0x00FF00);
        bind(&mut loaded, &BindingTable::new().with("A", x.clone())).unwrap();

        c.attach(loaded).unwrap();
        assert!(c.is_attached());
        assert_eq!(c.target.prepared, 1);

        let a = c.scene.node(c.scene.find_root("A").unwrap()).unwrap();
        let b = c.scene.node(c.scene.find_root("B").unwrap()).unwrap();
        assert_eq!(a.material.assigned(), Some(&x));
        assert!(b.material.is_default());

        let again = c.attach(SceneGraph::new()).unwrap_err();
        assert!(matches!(again, ViewerError::AlreadyAttached));
        assert_eq!(c.target.prepared, 1);
    }
}
