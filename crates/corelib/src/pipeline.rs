//! Load-and-bind: one awaitable step from asset paths to a fully bound scene.

use std::sync::Arc;

use asset::{AssetLoader, AssetSource, MaterialDescriptor, MeshDecoder, SceneGraph};

use crate::binding::{BindingTable, bind};
use crate::error::ViewerResult;

/// Paths of the two assets the viewer shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenePaths {
    pub mesh: String,
    pub texture: String,
}

impl ScenePaths {
    pub fn new(mesh: impl Into<String>, texture: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            texture: texture.into(),
        }
    }
}

/// Load both assets, build the binding table from the baked material and
/// bind it. The returned graph is ready to attach.
pub async fn load_bound_scene<S, D, F>(
    loader: &AssetLoader<S, D>,
    paths: &ScenePaths,
    table: F,
) -> ViewerResult<SceneGraph>
where
    S: AssetSource,
    D: MeshDecoder,
    F: FnOnce(Arc<MaterialDescriptor>) -> BindingTable,
{
    let loaded = loader.load(&paths.mesh, &paths.texture).await?;
    let mut scene = loaded.scene;
    bind(&mut scene, &table(loaded.baked_material))?;
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use anyhow::{Result, anyhow};
    use asset::{AssetError, ExternalBuffers, MaterialSlot, MeshData, Node};

    use super::*;
    use crate::binding::BindError;
    use crate::error::ViewerError;

    struct FixedSource;

    impl AssetSource for FixedSource {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
            match path {
                "ship.glb" => Ok(Vec::new()),
                "baked.png" => Ok(png_1x1()),
                other => Err(anyhow!("404: {}", other)),
            }
        }
    }

    /// Ignores the bytes and produces top-level nodes with the given names.
    struct NamedNodes {
        names: Vec<&'static str>,
        path: Option<PathBuf>,
    }

    impl NamedNodes {
        fn new(names: &[&'static str]) -> Self {
            Self {
                names: names.to_vec(),
                path: Some(PathBuf::from("draco/")),
            }
        }
    }

    impl MeshDecoder for NamedNodes {
        fn set_resource_path(&mut self, path: PathBuf) {
            self.path = Some(path);
        }

        fn resource_path(&self) -> Option<&Path> {
            self.path.as_deref()
        }

        fn decode(&self, _bytes: &[u8], _external: &ExternalBuffers) -> Result<SceneGraph> {
            let mut g = SceneGraph::new();
            for name in &self.names {
                g.add_root(Node::new(*name).with_mesh(MeshData::triangle()));
            }
            Ok(g)
        }
    }

    fn png_1x1() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([90, 80, 70, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn returns_scene_with_bindings_applied() {
        let loader = AssetLoader::new(FixedSource, NamedNodes::new(&["A", "B"])).unwrap();
        let paths = ScenePaths::new("ship.glb", "baked.png");
        let scene = pollster::block_on(load_bound_scene(&loader, &paths, |baked| {
            BindingTable::new().with("A", baked)
        }))
        .unwrap();

        let a = scene.node(scene.find_root("A").unwrap()).unwrap();
        assert!(matches!(
            a.material.assigned().map(|m| m.as_ref()),
            Some(MaterialDescriptor::Baked { .. })
        ));
        let b = scene.node(scene.find_root("B").unwrap()).unwrap();
        assert_eq!(b.material, MaterialSlot::default());
    }

    #[test]
    fn binding_failure_is_reported() {
        let loader = AssetLoader::new(FixedSource, NamedNodes::new(&["A"])).unwrap();
        let paths = ScenePaths::new("ship.glb", "baked.png");
        let err = pollster::block_on(load_bound_scene(&loader, &paths, BindingTable::baked_ship))
            .unwrap_err();
        assert!(matches!(
            err,
            ViewerError::Binding(BindError::MissingNode { ref name }) if name == "BASE002"
        ));
    }

    #[test]
    fn asset_failure_is_reported() {
        let loader = AssetLoader::new(FixedSource, NamedNodes::new(&["A"])).unwrap();
        let paths = ScenePaths::new("ship.glb", "missing.jpg");
        let err = pollster::block_on(load_bound_scene(&loader, &paths, BindingTable::baked_ship))
            .unwrap_err();
        assert!(matches!(err, ViewerError::Asset(AssetError::Fetch { .. })));
    }
}
