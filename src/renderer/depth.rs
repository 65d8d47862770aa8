use winit::dpi::PhysicalSize;

/// Scene depth carries a stencil aspect so depth/stencil clears apply.
pub const SCENE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
pub const SHADOW_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct Depth {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

impl Depth {
    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>) -> Self {
        let format = SCENE_DEPTH_FORMAT;
        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("SceneDepth"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
        Self { view, format }
    }

    pub fn has_stencil(&self) -> bool {
        self.format.has_stencil_aspect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_depth_has_stencil_and_shadow_map_does_not() {
        assert!(SCENE_DEPTH_FORMAT.has_stencil_aspect());
        assert!(!SHADOW_MAP_FORMAT.has_stencil_aspect());
        assert!(SHADOW_MAP_FORMAT.has_depth_aspect());
    }
}
