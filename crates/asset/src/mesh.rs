//! Geometry handed from the decoder to the renderer.

use anyhow::{Result, bail};

/// Object-space position plus the coordinate into the baked texture.
/// Shading is unlit, so no normals are kept.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

/// Triangle list: every three `indices` form one face.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Single triangle in the XY plane, handy for scenes built in code.
    pub fn triangle() -> Self {
        Self::new(
            vec![
                MeshVertex::new([0.0, 0.0, 0.0], [0.0, 1.0]),
                MeshVertex::new([1.0, 0.0, 0.0], [1.0, 1.0]),
                MeshVertex::new([0.0, 1.0, 0.0], [0.0, 0.0]),
            ],
            vec![0, 1, 2],
        )
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// No face to draw.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }

    /// Index buffer describes whole triangles and stays inside the vertex buffer.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            bail!("index count {} is not a multiple of 3", self.indices.len());
        }
        let count = self.vertices.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            bail!("index {} out of range for {} vertices", bad, count);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_is_one_valid_face() {
        let tri = MeshData::triangle();
        assert_eq!(tri.triangle_count(), 1);
        assert!(!tri.is_empty());
        tri.validate().unwrap();
    }

    #[test]
    fn empty_mesh_has_no_faces() {
        let mesh = MeshData::default();
        assert!(mesh.is_empty());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut mesh = MeshData::triangle();
        mesh.indices[2] = 3;
        let err = mesh.validate().unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn partial_face_is_rejected() {
        let mut mesh = MeshData::triangle();
        mesh.indices.push(0);
        assert!(mesh.validate().is_err());
    }
}
