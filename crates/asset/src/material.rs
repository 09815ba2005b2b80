//! Material descriptors and the per-node material slot.

use std::sync::Arc;

use crate::texture::TextureData;

/// sRGB color with components in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    /// Build from a `0xRRGGBB` literal.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Linear-light components, for shading into an sRGB target.
    pub fn to_linear(self) -> [f32; 3] {
        [self.r, self.g, self.b].map(srgb_to_linear)
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Immutable material shared by reference across nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialDescriptor {
    /// Unlit, texture-mapped material (precomputed lighting in the texture).
    Baked { texture: Arc<TextureData> },
    /// Flat, unlit color.
    Emissive { color: Rgb },
}

impl MaterialDescriptor {
    pub fn baked(texture: TextureData) -> Arc<Self> {
        Arc::new(Self::Baked {
            texture: Arc::new(texture),
        })
    }

    pub fn emissive(hex: u32) -> Arc<Self> {
        Arc::new(Self::Emissive {
            color: Rgb::from_hex(hex),
        })
    }
}

/// Material slot of a scene node.
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialSlot {
    /// Material that came with the asset, reduced to its base color.
    Default { base_color: [f32; 4] },
    Assigned(Arc<MaterialDescriptor>),
}

impl MaterialSlot {
    pub fn assigned(&self) -> Option<&Arc<MaterialDescriptor>> {
        match self {
            Self::Assigned(m) => Some(m),
            Self::Default { .. } => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default { .. })
    }
}

impl Default for MaterialSlot {
    fn default() -> Self {
        Self::Default {
            base_color: [1.0; 4],
        }
    }
}
