//! Texture data and decoding.
//! Textures are kept as RGBA8 plus a color-space tag that tells the renderer
//! whether texels are already gamma-encoded.

use anyhow::{Context, anyhow, bail};

/// How texel values should be interpreted when sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSpace {
    /// Texels are gamma-encoded; sampling must decode them to linear.
    #[default]
    Srgb,
    /// Texels are linear values and are sampled as-is.
    Linear,
}

/// Decode-time options for a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureOptions {
    /// Reverse row order after decoding.
    pub flip_y: bool,
    pub color_space: ColorSpace,
}

impl TextureOptions {
    /// Baked lightmaps are authored in glTF UV convention (no flip) and
    /// stored gamma-encoded.
    pub const BAKED: Self = Self {
        flip_y: false,
        color_space: ColorSpace::Srgb,
    };
}

/// Tightly packed RGBA8 texels, row 0 at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
}

/// Byte length of a `width` x `height` RGBA8 image, if it fits in memory.
fn rgba8_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

impl TextureData {
    /// Wrap RGBA8 texels. Fails if `data` does not hold exactly
    /// `width * height` texels or the image is empty.
    pub fn new_rgba8(
        width: u32,
        height: u32,
        data: Vec<u8>,
        color_space: ColorSpace,
    ) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            bail!("texture has no texels ({}x{})", width, height);
        }
        let expected = rgba8_len(width, height)
            .ok_or_else(|| anyhow!("texture {}x{} is too large", width, height))?;
        if data.len() != expected {
            bail!(
                "RGBA8 texture {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            );
        }
        Ok(Self {
            data,
            width,
            height,
            color_space,
        })
    }

    /// 1x1 texture of a single color.
    pub fn solid(rgba: [u8; 4], color_space: ColorSpace) -> Self {
        Self {
            data: rgba.to_vec(),
            width: 1,
            height: 1,
            color_space,
        }
    }

    /// Decode an encoded image (PNG or JPEG) held in memory.
    pub fn decode(bytes: &[u8], options: TextureOptions) -> anyhow::Result<Self> {
        let img = image::load_from_memory(bytes).context("Failed to decode image")?;

        let mut rgba = img.to_rgba8();
        if options.flip_y {
            image::imageops::flip_vertical_in_place(&mut rgba);
        }
        let (width, height) = rgba.dimensions();

        log::info!(
            "Decoded texture {}x{} ({:?}, flip_y={})",
            width,
            height,
            options.color_space,
            options.flip_y
        );

        Self::new_rgba8(width, height, rgba.into_raw(), options.color_space)
    }

    /// RGBA of the texel at (x, y), row 0 at the top.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data.get(i..i + 4).and_then(|px| px.try_into().ok())
    }
}
