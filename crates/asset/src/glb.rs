//! glTF 2.0 / GLB decoding into a [`SceneGraph`].
//! Every node of the default scene becomes a graph node; all triangle
//! primitives of a node's mesh are merged into one [`MeshData`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use gltf::buffer::Source;

use crate::material::MaterialSlot;
use crate::mesh::{MeshData, MeshVertex};
use crate::scene::{Node, NodeId, SceneGraph};

/// Bytes of the files a bundle references, keyed by the URI it uses.
pub type ExternalBuffers = HashMap<String, Vec<u8>>;

/// Turns an encoded mesh bundle into a scene graph.
pub trait MeshDecoder {
    /// Directory holding the decoder's own support files.
    fn set_resource_path(&mut self, path: PathBuf);

    fn resource_path(&self) -> Option<&Path>;

    /// URIs of files the bundle references, relative to the bundle itself.
    fn external_uris(&self, _bytes: &[u8]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Decode `bytes`; `external` holds every file named by [`Self::external_uris`].
    fn decode(&self, bytes: &[u8], external: &ExternalBuffers) -> Result<SceneGraph>;
}

/// Decoder backed by the `gltf` crate. Accepts `.glb` and `.gltf`; buffers
/// come from the GLB binary chunk, data URIs, or `external`.
#[derive(Clone, Debug, Default)]
pub struct GlbDecoder {
    resource_path: Option<PathBuf>,
}

impl GlbDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.set_resource_path(path.into());
        self
    }
}

fn external_uri<'a>(source: &Source<'a>) -> Option<&'a str> {
    match *source {
        Source::Uri(uri) if !uri.starts_with("data:") => Some(uri),
        _ => None,
    }
}

impl MeshDecoder for GlbDecoder {
    fn set_resource_path(&mut self, path: PathBuf) {
        log::debug!("glTF decoder resource path: {}", path.display());
        self.resource_path = Some(path);
    }

    fn resource_path(&self) -> Option<&Path> {
        self.resource_path.as_deref()
    }

    fn external_uris(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let gltf = gltf::Gltf::from_slice(bytes).context("Failed to parse glTF document")?;
        Ok(gltf
            .document
            .buffers()
            .filter_map(|b| external_uri(&b.source()).map(str::to_owned))
            .collect())
    }

    fn decode(&self, bytes: &[u8], external: &ExternalBuffers) -> Result<SceneGraph> {
        let gltf::Gltf {
            document,
            mut blob,
        } = gltf::Gltf::from_slice(bytes).context("Failed to parse glTF document")?;
        let buffers = document
            .buffers()
            .map(|b| load_buffer(&b, external, &mut blob))
            .collect::<Result<Vec<_>>>()
            .context("Failed to load glTF buffers")?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| anyhow!("glTF document contains no scene"))?;

        let mut graph = SceneGraph::new();
        for node in scene.nodes() {
            let id = graph.add_root(convert_node(&node, &buffers)?);
            add_children(&mut graph, id, &node, &buffers)?;
        }

        log::info!(
            "Decoded glTF scene: {} nodes ({} top-level)",
            graph.len(),
            graph.roots().len()
        );
        Ok(graph)
    }
}

fn load_buffer(
    buffer: &gltf::Buffer<'_>,
    external: &ExternalBuffers,
    blob: &mut Option<Vec<u8>>,
) -> Result<gltf::buffer::Data> {
    let source = buffer.source();
    let data = match external_uri(&source) {
        Some(uri) => external
            .get(uri)
            .map(|bytes| gltf::buffer::Data(bytes.clone()))
            .ok_or_else(|| anyhow!("External buffer '{}' was not provided", uri))?,
        None => gltf::buffer::Data::from_source_and_blob(source, None, blob)
            .with_context(|| format!("Failed to read buffer {}", buffer.index()))?,
    };
    if data.0.len() < buffer.length() {
        bail!(
            "Buffer {} holds {} bytes, expected {}",
            buffer.index(),
            data.0.len(),
            buffer.length()
        );
    }
    Ok(data)
}

fn add_children(
    graph: &mut SceneGraph,
    parent: NodeId,
    node: &gltf::Node<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<()> {
    for child in node.children() {
        let id = graph
            .add_child(parent, convert_node(&child, buffers)?)
            .ok_or_else(|| anyhow!("Parent node {:?} vanished while decoding", parent))?;
        add_children(graph, id, &child, buffers)?;
    }
    Ok(())
}

fn convert_node(node: &gltf::Node<'_>, buffers: &[gltf::buffer::Data]) -> Result<Node> {
    let name = node.name().unwrap_or_default();
    let local = glam::Mat4::from_cols_array_2d(&node.transform().matrix());
    let mut out = Node::new(name).with_local(local);

    if let Some(mesh) = node.mesh() {
        let base_color = mesh
            .primitives()
            .next()
            .map(|p| p.material().pbr_metallic_roughness().base_color_factor())
            .unwrap_or([1.0; 4]);
        out = out.with_material(MaterialSlot::Default { base_color });

        let data = read_mesh(&mesh, buffers)
            .and_then(|data| data.validate().map(|_| data))
            .with_context(|| format!("Failed to read mesh of node '{}'", name))?;
        if !data.is_empty() {
            out = out.with_mesh(data);
        } else {
            log::warn!("Node '{}' has a mesh without triangles; skipping geometry", name);
        }
    }
    Ok(out)
}

fn read_mesh(mesh: &gltf::Mesh<'_>, buffers: &[gltf::buffer::Data]) -> Result<MeshData> {
    let mut vertices: Vec<MeshVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for prim in mesh.primitives() {
        if prim.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("Skipping primitive {} with mode {:?}", prim.index(), prim.mode());
            continue;
        }
        let reader = prim.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| anyhow!("Primitive {} has no POSITION attribute", prim.index()))?
            .collect();
        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|t| t.into_f32().collect())
            .unwrap_or_default();

        let base = u32::try_from(vertices.len())
            .map_err(|_| anyhow!("Too many vertices in mesh (>{})", u32::MAX))?;
        let count = u32::try_from(positions.len())
            .map_err(|_| anyhow!("Too many vertices in primitive (>{})", u32::MAX))?;

        vertices.extend(positions.iter().enumerate().map(|(i, &p)| {
            let uv = uvs.get(i).copied().unwrap_or([0.0, 0.0]);
            MeshVertex::new(p, uv)
        }));

        match reader.read_indices() {
            Some(read) => indices.extend(read.into_u32().map(|i| base + i)),
            None => indices.extend(base..base + count),
        }
    }

    Ok(MeshData::new(vertices, indices))
}
