//! Offscreen scene target sized by the capped pixel ratio, and the pass that
//! scales it onto the window surface. The scene is drawn multisampled when
//! the adapter allows it and resolved into the image the present pass reads.

use wgpu::{
    BindGroup, BindGroupLayout, Device, Extent3d, Sampler, TextureDescriptor, TextureDimension,
    TextureFormat, TextureFormatFeatureFlags, TextureUsages, TextureView, TextureViewDescriptor,
};

pub(crate) const SCENE_COLOR_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;
pub(crate) const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
/// Antialiasing sample count used when both scene formats support it.
pub(crate) const MSAA_SAMPLES: u32 = 4;

/// Sample count for the scene pass given the adapter's format features.
pub(crate) fn pick_sample_count(
    color: TextureFormatFeatureFlags,
    depth: TextureFormatFeatureFlags,
) -> u32 {
    let msaa = color.sample_count_supported(MSAA_SAMPLES)
        && color.contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE)
        && depth.sample_count_supported(MSAA_SAMPLES);
    if msaa { MSAA_SAMPLES } else { 1 }
}

/// Pixel size of the scene image for a logical size and pixel ratio, clamped
/// to `[1, max_dim]` per axis.
pub(crate) fn scaled_extent(width: u32, height: u32, ratio: f32, max_dim: u32) -> (u32, u32) {
    let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
    let scale = |v: u32| ((v as f32 * ratio).round() as u32).clamp(1, max_dim.max(1));
    (scale(width), scale(height))
}

pub(crate) struct SceneTarget {
    /// Single-sampled image read by the present pass.
    pub color_view: TextureView,
    /// Multisampled render image resolved into `color_view`.
    pub msaa_view: Option<TextureView>,
    pub depth_view: TextureView,
    /// Present-pass bind group sampling `color_view`.
    pub present_bg: BindGroup,
    pub width: u32,
    pub height: u32,
}

impl SceneTarget {
    pub fn new(
        device: &Device,
        present_bgl: &BindGroupLayout,
        sampler: &Sampler,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Self {
        let size = (width, height);
        let color_view = create_view(device, "SceneColor", SCENE_COLOR_FORMAT, size, 1, true);
        let msaa_view = (sample_count > 1).then(|| {
            create_view(
                device,
                "SceneColorMsaa",
                SCENE_COLOR_FORMAT,
                size,
                sample_count,
                false,
            )
        });
        let depth_view =
            create_view(device, "SceneDepth", DEPTH_FORMAT, size, sample_count, false);
        let present_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Present BG"),
            layout: present_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        log::debug!("Scene target {}x{} ({}x MSAA)", width, height, sample_count);
        Self {
            color_view,
            msaa_view,
            depth_view,
            present_bg,
            width,
            height,
        }
    }

    /// Render view and optional resolve target for the scene pass.
    pub fn color_attachment(&self) -> (&TextureView, Option<&TextureView>) {
        match &self.msaa_view {
            Some(msaa) => (msaa, Some(&self.color_view)),
            None => (&self.color_view, None),
        }
    }
}

fn create_view(
    device: &Device,
    label: &str,
    format: TextureFormat,
    (width, height): (u32, u32),
    sample_count: u32,
    sampled: bool,
) -> TextureView {
    let mut usage = TextureUsages::RENDER_ATTACHMENT;
    if sampled {
        usage |= TextureUsages::TEXTURE_BINDING;
    }
    let tex = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size: Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_follows_pixel_ratio() {
        assert_eq!(scaled_extent(800, 600, 1.0, 8192), (800, 600));
        assert_eq!(scaled_extent(800, 600, 2.0, 8192), (1600, 1200));
        assert_eq!(scaled_extent(801, 601, 1.5, 8192), (1202, 902));
    }

    #[test]
    fn msaa_needs_resolve_and_both_formats() {
        use TextureFormatFeatureFlags as F;
        let color = F::MULTISAMPLE_X4 | F::MULTISAMPLE_RESOLVE;
        assert_eq!(pick_sample_count(color, F::MULTISAMPLE_X4), MSAA_SAMPLES);
        assert_eq!(pick_sample_count(F::MULTISAMPLE_X4, F::MULTISAMPLE_X4), 1);
        assert_eq!(pick_sample_count(color, F::empty()), 1);
        assert_eq!(pick_sample_count(F::MULTISAMPLE_RESOLVE, F::MULTISAMPLE_X4), 1);
    }

    #[test]
    fn extent_is_never_zero_or_oversized() {
        assert_eq!(scaled_extent(800, 600, 0.0, 8192), (800, 600));
        assert_eq!(scaled_extent(0, 0, 2.0, 8192), (1, 1));
        assert_eq!(scaled_extent(5000, 100, 2.0, 8192), (8192, 200));
        assert_eq!(scaled_extent(100, 100, f32::NAN, 8192), (100, 100));
    }
}
