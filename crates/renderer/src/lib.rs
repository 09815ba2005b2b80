//! Renderer: wgpu surface, unlit scene pipeline and capped-resolution present.
//! wgpu = 26.x, winit = 0.30.x
//!
//! The scene is drawn into an offscreen image of `logical size * pixel ratio`
//! pixels, then scaled onto the window surface. With the pixel ratio capped
//! by the viewer this bounds fragment cost on high-density displays.

mod gpu_scene;
mod present;

use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{Context, Result};
use asset::SceneGraph;
use bytemuck::{Pod, Zeroable};
use corelib::{Camera, RenderTarget};
use glam::Mat4;
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device, DeviceDescriptor,
    Features, FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, Sampler,
    SamplerBindingType, ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface,
    SurfaceConfiguration, SurfaceError, TextureFormat, TextureSampleType, TextureUsages,
    TextureViewDimension, VertexState,
};
use winit::{dpi::PhysicalSize, window::Window};

use gpu_scene::{GpuScene, GpuVertex, SceneLayouts};
use present::{DEPTH_FORMAT, SCENE_COLOR_FORMAT, SceneTarget, pick_sample_count, scaled_extent};

/// Camera UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

pub struct GpuState {
    window: Arc<Window>,

    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,
    max_texture_dim: u32,
    sample_count: u32,

    // Scene pass
    layouts: SceneLayouts,
    scene_pipeline: RenderPipeline,
    camera_buf: Buffer,
    camera_bg: BindGroup,
    material_sampler: Sampler,
    gpu_scene: GpuScene,

    // Present pass
    present_pipeline: RenderPipeline,
    present_bgl: BindGroupLayout,
    present_sampler: Sampler,
    scene_target: SceneTarget,
    scene_target_dirty: bool,

    // Logical size + capped pixel ratio requested by the viewer
    width: u32,
    height: u32,
    pixel_ratio: f32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, backends: wgpu::Backends) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let scale = window.scale_factor() as f32;

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Viewer Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("request_device failed")?;
        let max_texture_dim = device.limits().max_texture_dimension_2d;
        let sample_count = pick_sample_count(
            adapter.get_texture_format_features(SCENE_COLOR_FORMAT).flags,
            adapter.get_texture_format_features(DEPTH_FORMAT).flags,
        );
        log::info!("Scene pass uses {}x MSAA", sample_count);

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no formats")?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let layouts = create_scene_layouts(&device);

        // Initial camera (identity, real matrix written in render()).
        let camera_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera UBO"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(
            &camera_buf,
            0,
            bytemuck::bytes_of(&CameraUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
        );
        let camera_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera BG"),
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buf.as_entire_binding(),
            }],
        });

        let material_sampler =
            create_sampler(&device, "Material Sampler", wgpu::AddressMode::Repeat);
        let present_sampler =
            create_sampler(&device, "Present Sampler", wgpu::AddressMode::ClampToEdge);

        let scene_pipeline = create_scene_pipeline(&device, &layouts, sample_count);
        let present_bgl = create_texture_layout(&device, "Present BGL");
        let present_pipeline = create_present_pipeline(&device, &present_bgl, surface_format);

        // Start at the window's own resolution; the viewer sets the real
        // logical size and pixel ratio right after construction.
        let logical_w = ((width as f32) / scale).round().max(1.0) as u32;
        let logical_h = ((height as f32) / scale).round().max(1.0) as u32;
        let (tw, th) = scaled_extent(logical_w, logical_h, scale, max_texture_dim);
        let scene_target =
            SceneTarget::new(&device, &present_bgl, &present_sampler, tw, th, sample_count);

        Ok(Self {
            window,
            surface,
            surface_config,
            device,
            queue,
            max_texture_dim,
            sample_count,
            layouts,
            scene_pipeline,
            camera_buf,
            camera_bg,
            material_sampler,
            gpu_scene: GpuScene::default(),
            present_pipeline,
            present_bgl,
            present_sampler,
            scene_target,
            scene_target_dirty: false,
            width: logical_w,
            height: logical_h,
            pixel_ratio: scale,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    /// Reconfigure the surface to the window's current physical size.
    pub fn recreate_surface(&mut self) {
        let PhysicalSize { width, height } = self.window.inner_size();
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Pixel size of the offscreen scene image currently in use.
    pub fn scene_extent(&self) -> (u32, u32) {
        (self.scene_target.width, self.scene_target.height)
    }

    fn refresh_scene_target(&mut self) {
        let (w, h) =
            scaled_extent(self.width, self.height, self.pixel_ratio, self.max_texture_dim);
        if (w, h) != self.scene_extent() {
            self.scene_target = SceneTarget::new(
                &self.device,
                &self.present_bgl,
                &self.present_sampler,
                w,
                h,
                self.sample_count,
            );
        }
        self.scene_target_dirty = false;
    }
}

impl RenderTarget for GpuState {
    type Error = SurfaceError;

    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.recreate_surface();
        self.scene_target_dirty = true;
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        if ratio != self.pixel_ratio {
            self.pixel_ratio = ratio;
            self.scene_target_dirty = true;
        }
    }

    fn prepare(&mut self, scene: &SceneGraph) {
        self.gpu_scene = GpuScene::build(
            &self.device,
            &self.queue,
            &self.layouts,
            &self.material_sampler,
            scene,
        );
    }

    /// Render one frame: update camera + draw scene offscreen + present.
    fn render(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<(), SurfaceError> {
        if self.scene_target_dirty {
            self.refresh_scene_target();
        }

        let cam = CameraUniform {
            view_proj: camera.proj_view().to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.camera_buf, 0, bytemuck::bytes_of(&cam));

        let frame = self.surface.get_current_texture()?;
        let surface_view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let (view, resolve_target) = self.scene_target.color_attachment();
            // Only the resolved image is read afterwards.
            let store = if resolve_target.is_some() {
                StoreOp::Discard
            } else {
                StoreOp::Store
            };
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("ScenePass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.scene_target.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // Nothing attached yet: the pass only clears.
            if !scene.is_empty() && !self.gpu_scene.is_empty() {
                rpass.set_pipeline(&self.scene_pipeline);
                rpass.set_bind_group(0, &self.camera_bg, &[]);
                self.gpu_scene.draw(&mut rpass);
            }
        }

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("PresentPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &surface_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            rpass.set_pipeline(&self.present_pipeline);
            rpass.set_bind_group(0, &self.scene_target.present_bg, &[]);
            rpass.draw(0..3, 0..1);
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn create_sampler(device: &Device, label: &str, address_mode: wgpu::AddressMode) -> Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// texture_2d<f32> at binding 0 + filtering sampler at binding 1.
fn create_texture_layout(device: &Device, label: &str) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn uniform_layout(
    device: &Device,
    label: &str,
    size: usize,
    visibility: ShaderStages,
) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(size as u64),
            },
            count: None,
        }],
    })
}

fn create_scene_layouts(device: &Device) -> SceneLayouts {
    SceneLayouts {
        camera: uniform_layout(
            device,
            "Camera BGL",
            std::mem::size_of::<CameraUniform>(),
            ShaderStages::VERTEX,
        ),
        node: uniform_layout(
            device,
            "Node BGL",
            std::mem::size_of::<gpu_scene::NodeUniform>(),
            ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        ),
        texture: create_texture_layout(device, "Material BGL"),
    }
}

fn create_scene_pipeline(
    device: &Device,
    layouts: &SceneLayouts,
    sample_count: u32,
) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("Unlit WGSL"),
        source: ShaderSource::Wgsl(include_str!("shaders/unlit.wgsl").into()),
    });
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("Scene PipelineLayout"),
        bind_group_layouts: &[&layouts.camera, &layouts.node, &layouts.texture],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Unlit Pipeline"),
        layout: Some(&layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[GpuVertex::LAYOUT],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: SCENE_COLOR_FORMAT,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode: Some(wgpu::Face::Back),
            ..Default::default()
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        },
        multiview: None,
        cache: None,
    })
}

fn create_present_pipeline(
    device: &Device,
    bgl: &BindGroupLayout,
    surface_format: TextureFormat,
) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("Present WGSL"),
        source: ShaderSource::Wgsl(include_str!("shaders/present.wgsl").into()),
    });
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("Present PipelineLayout"),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Present Pipeline"),
        layout: Some(&layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: surface_format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
