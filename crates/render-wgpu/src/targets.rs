use bloomwater_common::Viewport;

/// Format of every intermediate colour target.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub(crate) fn extent(size: Viewport) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width.max(1),
        height: size.height.max(1),
        depth_or_array_layers: 1,
    }
}

/// Sampleable HDR colour texture.
pub(crate) fn color_texture(device: &wgpu::Device, label: &str, size: Viewport) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HDR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

fn depth_texture(device: &wgpu::Device, label: &str, size: Viewport) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

/// Colour plus depth at full viewport resolution.
pub struct SceneTarget {
    pub color: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    pub size: Viewport,
}

impl SceneTarget {
    pub fn new(device: &wgpu::Device, label: &str, size: Viewport) -> Self {
        Self {
            color: color_texture(device, &format!("{label}_color"), size),
            depth: depth_texture(device, &format!("{label}_depth"), size),
            size,
        }
    }
}
