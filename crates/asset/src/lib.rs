//! Asset loading and the data model it produces.
//! Scene graph + material descriptors, glTF/GLB decoding, baked texture
//! decoding, and the loader that fetches both.

pub mod error;
pub mod glb;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod source;
pub mod texture;

pub use error::AssetError;
pub use glb::{ExternalBuffers, GlbDecoder, MeshDecoder};
pub use loader::{AssetLoader, LoadedAssets};
pub use material::{MaterialDescriptor, MaterialSlot, Rgb};
pub use mesh::{MeshData, MeshVertex};
pub use scene::{Node, NodeId, Renderable, SceneGraph};
pub use source::{AssetSource, FileSource};
pub use texture::{ColorSpace, TextureData, TextureOptions};
