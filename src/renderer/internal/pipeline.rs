use std::collections::HashMap;

use crate::error::RendererError;
use crate::renderer::pipeline::{PipelineDesc, PipelineKind};
use crate::renderer::shaders::{ShaderLibrary, ShaderStage};
use crate::renderer::PipelineBuilder;

/// The two pipeline layouts: lit pipelines see all three groups, shadow
/// pipelines only the uniform group.
pub(crate) struct PipelineLayouts {
    pub(crate) full: wgpu::PipelineLayout,
    pub(crate) shadow: wgpu::PipelineLayout,
}

impl PipelineLayouts {
    pub(crate) fn new(
        device: &wgpu::Device,
        uniforms: &wgpu::BindGroupLayout,
        pass_textures: &wgpu::BindGroupLayout,
        material_textures: &wgpu::BindGroupLayout,
    ) -> Self {
        let full = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ScenePipelineLayout"),
            bind_group_layouts: &[uniforms, pass_textures, material_textures],
            push_constant_ranges: &[],
        });
        let shadow = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ShadowPipelineLayout"),
            bind_group_layouts: &[uniforms],
            push_constant_ranges: &[],
        });
        Self { full, shadow }
    }
}

pub(crate) struct RenderPipelines {
    pipelines: HashMap<PipelineKind, wgpu::RenderPipeline>,
}

impl RenderPipelines {
    pub(crate) fn new(
        device: &wgpu::Device,
        shaders: &ShaderLibrary,
        layouts: &PipelineLayouts,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, RendererError> {
        let mut modules: HashMap<&'static str, wgpu::ShaderModule> = HashMap::new();
        let mut pipelines = HashMap::new();

        for kind in PipelineKind::ALL {
            let desc = kind.desc();
            for name in std::iter::once(desc.vertex_shader).chain(desc.fragment_shader) {
                if modules.contains_key(name) {
                    continue;
                }
                let entry = shaders
                    .get(name)
                    .ok_or_else(|| RendererError::MissingShader(name.to_string()))?;
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(name),
                    source: wgpu::ShaderSource::Wgsl(entry.source.as_str().into()),
                });
                modules.insert(name, module);
            }

            let layout = if kind.is_shadow() {
                &layouts.shadow
            } else {
                &layouts.full
            };
            let pipeline = Self::build(device, shaders, &modules, layout, &desc, color_format)?;
            pipelines.insert(kind, pipeline);
        }

        log::info!(
            "Built {} pipelines from {} shader modules",
            pipelines.len(),
            modules.len()
        );
        Ok(Self { pipelines })
    }

    fn build(
        device: &wgpu::Device,
        shaders: &ShaderLibrary,
        modules: &HashMap<&'static str, wgpu::ShaderModule>,
        layout: &wgpu::PipelineLayout,
        desc: &PipelineDesc,
        color_format: wgpu::TextureFormat,
    ) -> Result<wgpu::RenderPipeline, RendererError> {
        let stage = |name: &'static str, expected: ShaderStage| {
            let entry = shaders
                .get(name)
                .filter(|entry| entry.stage == expected)
                .ok_or_else(|| RendererError::MissingShader(name.to_string()))?;
            let module = modules
                .get(name)
                .ok_or_else(|| RendererError::MissingShader(name.to_string()))?;
            Ok::<_, RendererError>((module, entry.entry_point))
        };

        let (vertex_module, vertex_entry) = stage(desc.vertex_shader, ShaderStage::Vertex)?;

        let mut builder = PipelineBuilder::new(device, layout, vertex_module)
            .with_label(desc.label)
            .with_vertex_entry(vertex_entry)
            .with_vertex_buffer(desc.vertex_layout.layout())
            .with_cull_mode(desc.cull_mode)
            .with_depth_stencil(
                desc.depth_format,
                desc.depth_write,
                desc.depth_compare,
                desc.depth_bias,
            );

        if let Some(fragment) = desc.fragment_shader {
            let (module, entry) = stage(fragment, ShaderStage::Fragment)?;
            builder = builder.with_fragment(module, entry);
        }
        if desc.color_target {
            builder = builder.with_color_target(color_format, desc.blend);
        }

        Ok(builder.build())
    }

    pub(crate) fn get(&self, kind: PipelineKind) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&kind)
    }
}
