use std::collections::HashMap;

use crate::renderer::binding::{SHADOW_SAMPLER_BINDING, WRAP_SAMPLER_BINDING};
use crate::renderer::internal::ShadowMap;
use crate::renderer::texture::{GpuTexture, TexturePixels};
use crate::scene::{TextureKind, TextureTable};

fn texture_entry(
    binding: u32,
    sample_type: wgpu::TextureSampleType,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

const FLOAT: wgpu::TextureSampleType = wgpu::TextureSampleType::Float { filterable: true };

/// Every scene texture in descriptor-slot order, plus the bind groups that
/// expose them. Groups are built on first use and cached per slot choice.
pub(crate) struct TextureHeap {
    textures: Vec<GpuTexture>,
    placeholder_color: GpuTexture,
    placeholder_normal: GpuTexture,
    placeholder_cube: GpuTexture,
    wrap_sampler: wgpu::Sampler,
    pub(crate) pass_layout: wgpu::BindGroupLayout,
    pub(crate) material_layout: wgpu::BindGroupLayout,
    pass_groups: HashMap<Option<u32>, wgpu::BindGroup>,
    material_groups: HashMap<(Option<u32>, Option<u32>), wgpu::BindGroup>,
}

impl TextureHeap {
    pub(crate) fn new(device: &wgpu::Device, queue: &wgpu::Queue, table: &TextureTable) -> Self {
        let textures: Vec<GpuTexture> = table
            .iter()
            .map(|info| {
                GpuTexture::load_or_placeholder(device, queue, &info.name, &info.path, info.kind)
            })
            .collect();
        log::info!("Texture heap: {} textures + shadow map", textures.len());

        let placeholder = |kind: TextureKind, label: &str| {
            GpuTexture::upload(device, queue, label, &TexturePixels::placeholder(kind), kind)
        };

        let wrap_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("WrapSampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: 8,
            ..Default::default()
        });

        let pass_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PassTexturesBindLayout"),
            entries: &[
                texture_entry(0, FLOAT, wgpu::TextureViewDimension::Cube),
                texture_entry(
                    1,
                    wgpu::TextureSampleType::Depth,
                    wgpu::TextureViewDimension::D2,
                ),
                wgpu::BindGroupLayoutEntry {
                    binding: WRAP_SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SHADOW_SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MaterialTexturesBindLayout"),
            entries: &[
                texture_entry(0, FLOAT, wgpu::TextureViewDimension::D2),
                texture_entry(1, FLOAT, wgpu::TextureViewDimension::D2),
            ],
        });

        Self {
            textures,
            placeholder_color: placeholder(TextureKind::Color, "PlaceholderColor"),
            placeholder_normal: placeholder(TextureKind::NormalMap, "PlaceholderNormal"),
            placeholder_cube: placeholder(TextureKind::Cube, "PlaceholderCube"),
            wrap_sampler,
            pass_layout,
            material_layout,
            pass_groups: HashMap::new(),
            material_groups: HashMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.textures.len()
    }

    /// The slot's view when it holds a texture of a compatible kind.
    fn view(&self, heap_index: Option<u32>, cube: bool) -> Option<&wgpu::TextureView> {
        let texture = self.textures.get(heap_index? as usize)?;
        if (texture.kind == TextureKind::Cube) != cube {
            log::warn!(
                "Descriptor slot {:?} holds a {:?} texture, using a placeholder",
                heap_index,
                texture.kind
            );
            return None;
        }
        Some(&texture.view)
    }

    /// Group 1: sky cube, shadow map and the two samplers.
    pub(crate) fn pass_group(
        &mut self,
        device: &wgpu::Device,
        skybox: Option<u32>,
        shadow: &ShadowMap,
    ) -> &wgpu::BindGroup {
        if !self.pass_groups.contains_key(&skybox) {
            let sky = self
                .view(skybox, true)
                .unwrap_or(&self.placeholder_cube.view);
            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("PassTexturesBindGroup"),
                layout: &self.pass_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(sky),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&shadow.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: WRAP_SAMPLER_BINDING,
                        resource: wgpu::BindingResource::Sampler(&self.wrap_sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: SHADOW_SAMPLER_BINDING,
                        resource: wgpu::BindingResource::Sampler(&shadow.sampler),
                    },
                ],
            });
            self.pass_groups.insert(skybox, group);
        }
        &self.pass_groups[&skybox]
    }

    /// Group 2: diffuse and normal map, placeholders for missing slots.
    pub(crate) fn material_group(
        &mut self,
        device: &wgpu::Device,
        diffuse: Option<u32>,
        normal: Option<u32>,
    ) -> &wgpu::BindGroup {
        let key = (diffuse, normal);
        if !self.material_groups.contains_key(&key) {
            let diffuse_view = self
                .view(diffuse, false)
                .unwrap_or(&self.placeholder_color.view);
            let normal_view = self
                .view(normal, false)
                .unwrap_or(&self.placeholder_normal.view);
            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("MaterialTexturesBindGroup"),
                layout: &self.material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(diffuse_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(normal_view),
                    },
                ],
            });
            self.material_groups.insert(key, group);
        }
        &self.material_groups[&key]
    }
}
