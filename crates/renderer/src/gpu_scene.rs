//! Per-node GPU resources, built once when a scene is attached.

use std::collections::HashMap;
use std::sync::Arc;

use asset::{ColorSpace, MaterialDescriptor, MaterialSlot, MeshData, SceneGraph, TextureData};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, BufferUsages, Device, Queue, Sampler, TextureFormat,
    VertexBufferLayout, VertexStepMode,
};

/// Vertex: position + uv.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

impl GpuVertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
    };
}

/// Node UBO: world matrix + color multiplier.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct NodeUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

/// Which texture a node samples.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TextureChoice<'a> {
    White,
    Image(&'a Arc<TextureData>),
}

/// Color multiplier (linear) and texture for a material slot.
pub(crate) fn shade(slot: &MaterialSlot) -> ([f32; 4], TextureChoice<'_>) {
    match slot {
        MaterialSlot::Default { base_color } => (*base_color, TextureChoice::White),
        MaterialSlot::Assigned(material) => match material.as_ref() {
            MaterialDescriptor::Baked { texture } => ([1.0; 4], TextureChoice::Image(texture)),
            MaterialDescriptor::Emissive { color } => {
                let [r, g, b] = color.to_linear();
                ([r, g, b, 1.0], TextureChoice::White)
            }
        },
    }
}

pub(crate) fn gpu_vertices(mesh: &MeshData) -> Vec<GpuVertex> {
    mesh.vertices
        .iter()
        .map(|v| GpuVertex {
            pos: v.position,
            uv: v.uv,
        })
        .collect()
}

pub(crate) fn texture_format(space: ColorSpace) -> TextureFormat {
    match space {
        ColorSpace::Srgb => TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => TextureFormat::Rgba8Unorm,
    }
}

/// Bind group layouts shared by the scene pipeline and its resources.
pub(crate) struct SceneLayouts {
    pub camera: BindGroupLayout,
    pub node: BindGroupLayout,
    pub texture: BindGroupLayout,
}

struct DrawItem {
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
    node_bg: BindGroup,
    texture: usize,
}

/// Uploaded scene: one draw per renderable node, textures deduplicated by
/// shared descriptor.
#[derive(Default)]
pub(crate) struct GpuScene {
    items: Vec<DrawItem>,
    textures: Vec<BindGroup>,
}

impl GpuScene {
    pub fn build(
        device: &Device,
        queue: &Queue,
        layouts: &SceneLayouts,
        sampler: &Sampler,
        scene: &SceneGraph,
    ) -> Self {
        let white = TextureData::solid([255; 4], ColorSpace::Srgb);
        let mut textures = vec![texture_bind_group(device, queue, layouts, sampler, &white)];
        let mut slots: HashMap<*const TextureData, usize> = HashMap::new();
        let mut items = Vec::new();

        for r in scene.iter_renderables() {
            let (color, choice) = shade(r.material);
            let texture = match choice {
                TextureChoice::White => 0,
                TextureChoice::Image(tex) => *slots.entry(Arc::as_ptr(tex)).or_insert_with(|| {
                    textures.push(texture_bind_group(device, queue, layouts, sampler, tex));
                    textures.len() - 1
                }),
            };

            let vertices = gpu_vertices(r.mesh);
            let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Node VB"),
                contents: bytemuck::cast_slice(&vertices),
                usage: BufferUsages::VERTEX,
            });
            let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Node IB"),
                contents: bytemuck::cast_slice(&r.mesh.indices),
                usage: BufferUsages::INDEX,
            });
            let node_bg = node_bind_group(device, layouts, r.world, color);

            items.push(DrawItem {
                vertex_buf,
                index_buf,
                index_count: r.mesh.indices.len() as u32,
                node_bg,
                texture,
            });
        }

        log::info!(
            "Uploaded {} draw items, {} textures",
            items.len(),
            textures.len()
        );
        Self { items, textures }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Record all draws. Pipeline and camera bind group must already be set.
    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        for item in &self.items {
            rpass.set_bind_group(1, &item.node_bg, &[]);
            rpass.set_bind_group(2, &self.textures[item.texture], &[]);
            rpass.set_vertex_buffer(0, item.vertex_buf.slice(..));
            rpass.set_index_buffer(item.index_buf.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..item.index_count, 0, 0..1);
        }
    }
}

fn node_bind_group(
    device: &Device,
    layouts: &SceneLayouts,
    world: Mat4,
    color: [f32; 4],
) -> BindGroup {
    let uniform = NodeUniform {
        model: world.to_cols_array_2d(),
        color,
    };
    let buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Node UBO"),
        contents: bytemuck::bytes_of(&uniform),
        usage: BufferUsages::UNIFORM,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Node BG"),
        layout: &layouts.node,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buf.as_entire_binding(),
        }],
    })
}

fn texture_bind_group(
    device: &Device,
    queue: &Queue,
    layouts: &SceneLayouts,
    sampler: &Sampler,
    tex: &TextureData,
) -> BindGroup {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("Material Texture"),
            size: wgpu::Extent3d {
                width: tex.width,
                height: tex.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(tex.color_space),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &tex.data,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material Texture BG"),
        layout: &layouts.texture,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
