//! Platform layer: window, event loop, resize/pointer wiring and the
//! background scene load.
//!
//! - Frames are driven by redraw requests; each redraw runs one frame-loop
//!   tick and schedules the next one until the loop is cancelled.
//! - The scene is loaded and bound off the event-loop thread and handed back
//!   as a single user event.

mod app;
pub mod input;

use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use asset::{AssetLoader, FileSource, GlbDecoder, SceneGraph};
use corelib::{BindingTable, ScenePaths, ViewerResult, load_bound_scene};
use winit::event_loop::{EventLoop, EventLoopProxy};

/// Startup configuration of the viewer.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    /// Directory the asset paths are relative to.
    pub asset_root: PathBuf,
    pub mesh: String,
    pub texture: String,
    /// Mesh decoder resource directory, relative to `asset_root`.
    pub decoder_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub backends: wgpu::Backends,
    /// Stop after this many frames; run until closed when `None`.
    pub max_frames: Option<u64>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            mesh: "spaceship.glb".into(),
            texture: "baked_2.jpg".into(),
            decoder_path: PathBuf::from("draco/"),
            width: 1280,
            height: 720,
            backends: wgpu::Backends::all(),
            max_frames: None,
        }
    }
}

impl ViewerConfig {
    pub fn scene_paths(&self) -> ScenePaths {
        ScenePaths::new(self.mesh.clone(), self.texture.clone())
    }
}

/// Events delivered to the event loop from other threads.
#[derive(Debug)]
pub enum ViewerEvent {
    /// The load-and-bind pipeline finished.
    SceneReady(ViewerResult<SceneGraph>),
}

/// Open the viewer window and run until it is closed, the frame budget is
/// spent, or loading fails.
pub fn run_viewer(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("Failed to create event loop")?;
    let proxy = event_loop.create_proxy();

    let mut app = app::ViewerApp::new(config, proxy);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    app.finish()
}

/// Start loading on a worker thread; the bound scene (or the failure) comes
/// back as [`ViewerEvent::SceneReady`].
fn spawn_scene_load(config: &ViewerConfig, proxy: EventLoopProxy<ViewerEvent>) -> Result<()> {
    let source = FileSource::new(&config.asset_root);
    let decoder =
        GlbDecoder::new().with_resource_path(config.asset_root.join(&config.decoder_path));
    let loader = AssetLoader::new(source, decoder)?;
    let paths = config.scene_paths();

    thread::Builder::new()
        .name("scene-loader".into())
        .spawn(move || {
            let result = pollster::block_on(load_bound_scene(
                &loader,
                &paths,
                BindingTable::baked_ship,
            ));
            if proxy.send_event(ViewerEvent::SceneReady(result)).is_err() {
                log::warn!("Event loop closed before the scene finished loading");
            }
        })
        .context("Failed to spawn scene loader thread")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_ship_assets() {
        let config = ViewerConfig::default();
        assert_eq!(
            config.scene_paths(),
            ScenePaths::new("spaceship.glb", "baked_2.jpg")
        );
        assert_eq!(config.decoder_path, PathBuf::from("draco/"));
        assert!(config.max_frames.is_none());
    }
}
