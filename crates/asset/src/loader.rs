//! Asset loader: fetches the mesh bundle and the baked texture and turns them
//! into a scene graph plus a ready-to-use unlit material.

use std::sync::Arc;

use crate::error::AssetError;
use crate::glb::{ExternalBuffers, MeshDecoder};
use crate::material::MaterialDescriptor;
use crate::scene::SceneGraph;
use crate::source::AssetSource;
use crate::texture::{TextureData, TextureOptions};

/// Result of a successful load.
#[derive(Clone, Debug)]
pub struct LoadedAssets {
    pub scene: SceneGraph,
    /// Unlit material wrapping the baked texture.
    pub baked_material: Arc<MaterialDescriptor>,
}

pub struct AssetLoader<S, D> {
    source: S,
    decoder: D,
}

impl<S: AssetSource, D: MeshDecoder> AssetLoader<S, D> {
    /// The decoder must already know its resource path.
    pub fn new(source: S, decoder: D) -> Result<Self, AssetError> {
        if decoder.resource_path().is_none() {
            return Err(AssetError::DecoderNotConfigured);
        }
        Ok(Self { source, decoder })
    }

    /// Fetch and decode both assets. Failures are returned as-is, never retried.
    pub async fn load(
        &self,
        mesh_path: &str,
        texture_path: &str,
    ) -> Result<LoadedAssets, AssetError> {
        log::info!("Loading mesh '{}' and texture '{}'", mesh_path, texture_path);

        let mesh_bytes = self.fetch(mesh_path).await?;
        let mesh_error = |source: anyhow::Error| AssetError::Decode {
            path: mesh_path.to_owned(),
            source,
        };

        let mut external = ExternalBuffers::new();
        for uri in self.decoder.external_uris(&mesh_bytes).map_err(mesh_error)? {
            let bytes = self.fetch(&sibling_path(mesh_path, &uri)).await?;
            external.insert(uri, bytes);
        }
        let scene = self
            .decoder
            .decode(&mesh_bytes, &external)
            .map_err(mesh_error)?;

        let texture_bytes = self.fetch(texture_path).await?;
        let texture = TextureData::decode(&texture_bytes, TextureOptions::BAKED).map_err(
            |source| AssetError::Decode {
                path: texture_path.to_owned(),
                source,
            },
        )?;

        log::info!(
            "Loaded {} nodes and a {}x{} baked texture",
            scene.len(),
            texture.width,
            texture.height
        );

        Ok(LoadedAssets {
            scene,
            baked_material: MaterialDescriptor::baked(texture),
        })
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.source
            .fetch(path)
            .await
            .map_err(|source| AssetError::Fetch {
                path: path.to_owned(),
                source,
            })
    }
}

/// `uri` resolved against the directory holding `base`.
fn sibling_path(base: &str, uri: &str) -> String {
    match base.rfind('/') {
        Some(i) => format!("{}{}", &base[..=i], uri),
        None => uri.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::anyhow;

    use super::*;
    use crate::glb::GlbDecoder;
    use crate::glb::tests::{two_node_glb, two_node_gltf_with_bin};
    use crate::texture::ColorSpace;
    use crate::texture::tests::two_row_png;

    #[derive(Default)]
    struct MemorySource {
        files: HashMap<String, Vec<u8>>,
    }

    impl MemorySource {
        fn with(mut self, path: &str, bytes: Vec<u8>) -> Self {
            self.files.insert(path.to_owned(), bytes);
            self
        }
    }

    impl AssetSource for MemorySource {
        async fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow!("404: {}", path))
        }
    }

    fn source() -> MemorySource {
        MemorySource::default()
            .with("ship.glb", two_node_glb())
            .with("baked.png", two_row_png())
    }

    fn decoder() -> GlbDecoder {
        GlbDecoder::new().with_resource_path("draco/")
    }

    #[test]
    fn unconfigured_decoder_is_rejected() {
        let err = AssetLoader::new(source(), GlbDecoder::new()).err().unwrap();
        assert!(matches!(err, AssetError::DecoderNotConfigured));
    }

    #[test]
    fn loads_scene_and_baked_material() {
        let loader = AssetLoader::new(source(), decoder()).unwrap();
        let loaded = pollster::block_on(loader.load("ship.glb", "baked.png")).unwrap();

        assert_eq!(loaded.scene.roots().len(), 2);
        match loaded.baked_material.as_ref() {
            MaterialDescriptor::Baked { texture } => {
                assert_eq!(texture.color_space, ColorSpace::Srgb);
                // Not flipped: red row stays on top.
                assert_eq!(texture.pixel(0, 0), Some([255, 0, 0, 255]));
            }
            other => panic!("expected baked material, got {:?}", other),
        }
    }

    #[test]
    fn missing_texture_reports_fetch_failure() {
        let loader = AssetLoader::new(source(), decoder()).unwrap();
        let err = pollster::block_on(loader.load("ship.glb", "missing.jpg")).unwrap_err();
        assert!(matches!(err, AssetError::Fetch { .. }));
        assert_eq!(err.path(), Some("missing.jpg"));
    }

    #[test]
    fn corrupt_mesh_reports_decode_failure() {
        let src = source().with("broken.glb", b"glTF but not really".to_vec());
        let loader = AssetLoader::new(src, decoder()).unwrap();
        let err = pollster::block_on(loader.load("broken.glb", "baked.png")).unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
        assert_eq!(err.path(), Some("broken.glb"));
    }

    #[test]
    fn sibling_paths() {
        assert_eq!(sibling_path("ship.gltf", "ship.bin"), "ship.bin");
        assert_eq!(sibling_path("models/ship.gltf", "ship.bin"), "models/ship.bin");
        assert_eq!(sibling_path("a/b/ship.gltf", "data/ship.bin"), "a/b/data/ship.bin");
    }

    #[test]
    fn external_buffer_is_fetched_next_to_the_mesh() {
        let (json, bin) = two_node_gltf_with_bin();
        let src = source()
            .with("models/ship.gltf", json)
            .with("models/ship.bin", bin);
        let loader = AssetLoader::new(src, decoder()).unwrap();
        let loaded = pollster::block_on(loader.load("models/ship.gltf", "baked.png")).unwrap();
        assert_eq!(loaded.scene.roots().len(), 2);
    }

    #[test]
    fn missing_external_buffer_reports_its_path() {
        let (json, _) = two_node_gltf_with_bin();
        let src = source().with("models/ship.gltf", json);
        let loader = AssetLoader::new(src, decoder()).unwrap();
        let err = pollster::block_on(loader.load("models/ship.gltf", "baked.png")).unwrap_err();
        assert!(matches!(err, AssetError::Fetch { .. }));
        assert_eq!(err.path(), Some("models/ship.bin"));
    }

    #[test]
    fn corrupt_texture_reports_decode_failure() {
        let src = source().with("broken.png", vec![0u8; 16]);
        let loader = AssetLoader::new(src, decoder()).unwrap();
        let err = pollster::block_on(loader.load("ship.glb", "broken.png")).unwrap_err();
        assert_eq!(err.path(), Some("broken.png"));
    }
}
