use std::sync::Arc;

use anyhow::anyhow;
use corelib::{CancelToken, FrameLoop, FrameStatus, RenderTarget, ViewerContext, Viewport};
use renderer::GpuState;
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::input::PointerTracker;
use crate::{ViewerConfig, ViewerEvent, spawn_scene_load};

pub(crate) struct ViewerApp {
    config: ViewerConfig,
    /// Taken when the window comes up and the load is started.
    proxy: Option<EventLoopProxy<ViewerEvent>>,
    ctx: Option<ViewerContext<GpuState>>,
    frames: FrameLoop,
    cancel: CancelToken,
    pointer: PointerTracker,
    error: Option<anyhow::Error>,
}

impl ViewerApp {
    pub(crate) fn new(config: ViewerConfig, proxy: EventLoopProxy<ViewerEvent>) -> Self {
        let cancel = CancelToken::new();
        Self {
            config,
            proxy: Some(proxy),
            ctx: None,
            frames: FrameLoop::new(cancel.clone()),
            cancel,
            pointer: PointerTracker::new(),
            error: None,
        }
    }

    /// Outcome of the session once the event loop has returned.
    pub(crate) fn finish(mut self) -> anyhow::Result<()> {
        log::info!(
            "Frame loop stopped after {} frames ({:.1}s)",
            self.frames.frames(),
            self.frames.elapsed()
        );
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        self.error = Some(err);
        self.cancel.cancel();
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };

        match self.frames.tick(ctx) {
            Ok(FrameStatus::Continue) => {
                if self
                    .config
                    .max_frames
                    .is_some_and(|max| self.frames.frames() >= max)
                {
                    log::info!("Frame budget reached, stopping");
                    self.cancel.cancel();
                }
                ctx.target.window().request_redraw();
            }
            Ok(FrameStatus::Cancelled) => {
                event_loop.exit();
            }
            Err(err) if GpuState::is_surface_lost(&err) => {
                log::warn!("Surface {:?}; reconfiguring", err);
                ctx.target.recreate_surface();
                ctx.target.window().request_redraw();
            }
            Err(SurfaceError::OutOfMemory) => {
                self.error = Some(anyhow!("GPU out of memory"));
                self.cancel.cancel();
                event_loop.exit();
            }
            Err(err) => {
                log::warn!("Skipping frame: {:?}", err);
                ctx.target.window().request_redraw();
            }
        }
    }
}

/// Logical size and device pixel ratio of a window.
fn viewport_of(size: PhysicalSize<u32>, scale_factor: f64) -> Viewport {
    let logical: LogicalSize<f64> = size.to_logical(scale_factor);
    Viewport::new(
        logical.width.round() as u32,
        logical.height.round() as u32,
        scale_factor as f32,
    )
}

/// Push a window's physical size and scale factor into the viewer.
fn apply_window_size<T: RenderTarget>(
    ctx: &mut ViewerContext<T>,
    size: PhysicalSize<u32>,
    scale_factor: f64,
) {
    let vp = viewport_of(size, scale_factor);
    ctx.on_resize(vp.width, vp.height, vp.device_pixel_ratio);
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Baked Scene Viewer")
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, anyhow!("Failed to create window: {e}"));
                return;
            }
        };
        log::info!(
            "Window created: {}x{} (scale {:.2})",
            window.inner_size().width,
            window.inner_size().height,
            window.scale_factor()
        );

        let gpu = match pollster::block_on(GpuState::new(window.clone(), self.config.backends)) {
            Ok(gpu) => gpu,
            Err(e) => {
                self.fail(event_loop, e.context("GPU initialization failed"));
                return;
            }
        };

        let viewport = viewport_of(window.inner_size(), window.scale_factor());
        self.ctx = Some(ViewerContext::new(gpu, viewport));

        if let Some(proxy) = self.proxy.take() {
            if let Err(e) = spawn_scene_load(&self.config, proxy) {
                self.fail(event_loop, e);
                return;
            }
        }
        window.request_redraw();
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::SceneReady(result) => {
                let Some(ctx) = self.ctx.as_mut() else {
                    log::warn!("Scene arrived without a viewer context; dropping it");
                    return;
                };
                if let Err(err) = result.and_then(|scene| ctx.attach(scene)) {
                    self.fail(event_loop, anyhow::Error::new(err).context("Scene load failed"));
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                self.cancel.cancel();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            event => {
                let Some(ctx) = self.ctx.as_mut() else {
                    return;
                };
                match event {
                    WindowEvent::Resized(size) => {
                        let scale = ctx.target.window().scale_factor();
                        log::info!("Resized: {}x{} physical", size.width, size.height);
                        apply_window_size(ctx, size, scale);
                    }
                    WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                        // The OS may keep the physical size, in which case no
                        // Resized follows.
                        log::info!("Scale factor changed: {:.3}", scale_factor);
                        let size = ctx.target.window().inner_size();
                        apply_window_size(ctx, size, scale_factor);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        self.pointer.button(button, state);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let height = ctx.target.window().inner_size().height as f32;
                        self.pointer
                            .moved(position.x, position.y, height, &mut ctx.controls);
                    }
                    WindowEvent::CursorLeft { .. } => self.pointer.left(),
                    WindowEvent::MouseWheel { delta, .. } => {
                        self.pointer.wheel(delta, &mut ctx.controls);
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use asset::SceneGraph;
    use corelib::Camera;

    use super::*;

    #[derive(Default)]
    struct SizeTarget {
        size: Option<(u32, u32)>,
        ratio: Option<f32>,
    }

    impl RenderTarget for SizeTarget {
        type Error = ();
        fn set_size(&mut self, width: u32, height: u32) {
            self.size = Some((width, height));
        }
        fn set_pixel_ratio(&mut self, ratio: f32) {
            self.ratio = Some(ratio);
        }
        fn prepare(&mut self, _: &SceneGraph) {}
        fn render(&mut self, _: &SceneGraph, _: &Camera) -> Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn scale_change_at_same_physical_size_updates_viewport() {
        let mut ctx = ViewerContext::new(SizeTarget::default(), Viewport::new(1600, 900, 1.0));
        let physical = PhysicalSize::new(1600, 900);

        apply_window_size(&mut ctx, physical, 2.0);
        assert_eq!((ctx.viewport.width, ctx.viewport.height), (800, 450));
        assert_eq!(ctx.viewport.device_pixel_ratio, 2.0);
        assert_eq!(ctx.target.size, Some((800, 450)));
        assert_eq!(ctx.target.ratio, Some(2.0));

        apply_window_size(&mut ctx, physical, 3.0);
        assert_eq!(ctx.target.ratio, Some(2.0));
        assert_eq!(ctx.viewport.width, 533);
    }

    #[test]
    fn viewport_is_logical_with_host_ratio() {
        let vp = viewport_of(PhysicalSize::new(2400, 1350), 1.5);
        assert_eq!((vp.width, vp.height), (1600, 900));
        assert_eq!(vp.device_pixel_ratio, 1.5);

        let hi = viewport_of(PhysicalSize::new(4800, 2700), 3.0);
        assert_eq!((hi.width, hi.height), (1600, 900));
        assert_eq!(hi.pixel_ratio(), 2.0);
    }
}
