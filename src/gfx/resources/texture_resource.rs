//! Offscreen render targets
//!
//! Color and depth attachments for rendering views that never reach a
//! window surface.

/// GPU texture together with its default view.
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl TextureResource {
    /// Depth buffer format used for every view.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Color format of rendered views. The hardware encodes linear shader
    /// output to sRGB on store.
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    fn create(
        device: &wgpu::Device,
        size: (u32, u32),
        sample_count: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Depth attachment matching a color target of `size` and `sample_count`.
    pub fn create_depth_texture(
        device: &wgpu::Device,
        size: (u32, u32),
        sample_count: u32,
        label: &str,
    ) -> Self {
        Self::create(
            device,
            size,
            sample_count,
            Self::DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
            label,
        )
    }

    /// Multisampled color attachment, resolved into a single-sample target.
    pub fn create_msaa_target(
        device: &wgpu::Device,
        size: (u32, u32),
        sample_count: u32,
        label: &str,
    ) -> Self {
        Self::create(
            device,
            size,
            sample_count,
            Self::COLOR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
            label,
        )
    }

    /// Single-sample color target that can be copied back to the host.
    pub fn create_readback_target(device: &wgpu::Device, size: (u32, u32), label: &str) -> Self {
        Self::create(
            device,
            size,
            1,
            Self::COLOR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            label,
        )
    }
}
