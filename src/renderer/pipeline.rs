use crate::renderer::depth::{SCENE_DEPTH_FORMAT, SHADOW_MAP_FORMAT};
use crate::renderer::vertex::VertexLayoutKind;
use crate::scene::RenderLayer;

/// Every fixed-function configuration the frame uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Opaque,
    SkinnedOpaque,
    AlphaTested,
    Transparent,
    Skybox,
    Shadow,
    SkinnedShadow,
    Debug,
}

/// Depth bias of the shadow pass, in the units of a 32-bit float depth target.
pub const SHADOW_DEPTH_BIAS: i32 = 100_000;
pub const SHADOW_SLOPE_SCALED_BIAS: f32 = 1.0;

/// Backend-independent description of a pipeline. Shader fields are library
/// purpose names.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDesc {
    pub kind: PipelineKind,
    pub label: &'static str,
    pub vertex_shader: &'static str,
    pub fragment_shader: Option<&'static str>,
    pub vertex_layout: VertexLayoutKind,
    pub cull_mode: Option<wgpu::Face>,
    pub blend: Option<wgpu::BlendState>,
    pub depth_format: wgpu::TextureFormat,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write: bool,
    pub depth_bias: wgpu::DepthBiasState,
    /// Shadow pipelines render depth only and bind the uniform group alone.
    pub color_target: bool,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 8] = [
        PipelineKind::Opaque,
        PipelineKind::SkinnedOpaque,
        PipelineKind::AlphaTested,
        PipelineKind::Transparent,
        PipelineKind::Skybox,
        PipelineKind::Shadow,
        PipelineKind::SkinnedShadow,
        PipelineKind::Debug,
    ];

    pub fn for_layer(layer: RenderLayer) -> Self {
        match layer {
            RenderLayer::Opaque => PipelineKind::Opaque,
            RenderLayer::SkinnedOpaque => PipelineKind::SkinnedOpaque,
            RenderLayer::AlphaTested => PipelineKind::AlphaTested,
            RenderLayer::Transparent => PipelineKind::Transparent,
            RenderLayer::Debug => PipelineKind::Debug,
            RenderLayer::Skybox => PipelineKind::Skybox,
        }
    }

    pub fn is_shadow(self) -> bool {
        matches!(self, PipelineKind::Shadow | PipelineKind::SkinnedShadow)
    }

    pub fn desc(self) -> PipelineDesc {
        let opaque = PipelineDesc {
            kind: self,
            label: "OpaquePipeline",
            vertex_shader: "standardVS",
            fragment_shader: Some("opaquePS"),
            vertex_layout: VertexLayoutKind::Standard,
            cull_mode: Some(wgpu::Face::Back),
            blend: None,
            depth_format: SCENE_DEPTH_FORMAT,
            depth_compare: wgpu::CompareFunction::Less,
            depth_write: true,
            depth_bias: wgpu::DepthBiasState::default(),
            color_target: true,
        };

        match self {
            PipelineKind::Opaque => opaque,
            PipelineKind::SkinnedOpaque => PipelineDesc {
                label: "SkinnedOpaquePipeline",
                vertex_shader: "skinnedVS",
                vertex_layout: VertexLayoutKind::Skinned,
                ..opaque
            },
            PipelineKind::AlphaTested => PipelineDesc {
                label: "AlphaTestedPipeline",
                fragment_shader: Some("alphaTestedPS"),
                cull_mode: None,
                ..opaque
            },
            // Blends in insertion order with depth writes left on, so
            // overlapping transparent items can occlude each other.
            PipelineKind::Transparent => PipelineDesc {
                label: "TransparentPipeline",
                blend: Some(wgpu::BlendState {
                    color: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::SrcAlpha,
                        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                        operation: wgpu::BlendOperation::Add,
                    },
                    alpha: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::Zero,
                        operation: wgpu::BlendOperation::Add,
                    },
                }),
                ..opaque
            },
            PipelineKind::Skybox => PipelineDesc {
                label: "SkyboxPipeline",
                vertex_shader: "skyVS",
                fragment_shader: Some("skyPS"),
                cull_mode: None,
                depth_compare: wgpu::CompareFunction::LessEqual,
                ..opaque
            },
            PipelineKind::Shadow => PipelineDesc {
                label: "ShadowPipeline",
                vertex_shader: "shadowVS",
                fragment_shader: None,
                depth_format: SHADOW_MAP_FORMAT,
                depth_bias: wgpu::DepthBiasState {
                    constant: SHADOW_DEPTH_BIAS,
                    slope_scale: SHADOW_SLOPE_SCALED_BIAS,
                    clamp: 0.0,
                },
                color_target: false,
                ..opaque
            },
            PipelineKind::SkinnedShadow => PipelineDesc {
                kind: self,
                label: "SkinnedShadowPipeline",
                vertex_shader: "skinnedShadowVS",
                vertex_layout: VertexLayoutKind::Skinned,
                ..PipelineKind::Shadow.desc()
            },
            PipelineKind::Debug => PipelineDesc {
                label: "DebugPipeline",
                vertex_shader: "debugVS",
                fragment_shader: Some("debugPS"),
                ..opaque
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::shadow_pass::SHADOW_CASTERS;

    #[test]
    fn every_layer_has_a_pipeline_and_only_opaque_layers_cast() {
        for layer in RenderLayer::ALL {
            let _ = PipelineKind::for_layer(layer);
        }
        let casters: Vec<_> = SHADOW_CASTERS.iter().map(|&(layer, _)| layer).collect();
        assert_eq!(casters, vec![RenderLayer::Opaque, RenderLayer::SkinnedOpaque]);
        for (layer, kind) in SHADOW_CASTERS {
            assert!(kind.is_shadow());
            assert!(!PipelineKind::for_layer(layer).is_shadow());
            assert_eq!(
                kind.desc().vertex_layout,
                PipelineKind::for_layer(layer).desc().vertex_layout
            );
        }
    }

    #[test]
    fn shadow_pipelines_are_depth_only_with_bias() {
        for kind in [PipelineKind::Shadow, PipelineKind::SkinnedShadow] {
            let desc = kind.desc();
            assert_eq!(desc.kind, kind);
            assert!(desc.fragment_shader.is_none());
            assert!(!desc.color_target);
            assert_eq!(desc.depth_bias.constant, 100_000);
            assert_eq!(desc.depth_bias.slope_scale, 1.0);
            assert_eq!(desc.depth_format, SHADOW_MAP_FORMAT);
        }
        assert_eq!(
            PipelineKind::SkinnedShadow.desc().vertex_layout,
            VertexLayoutKind::Skinned
        );
    }

    #[test]
    fn layer_specific_state() {
        let alpha = PipelineKind::AlphaTested.desc();
        assert!(alpha.cull_mode.is_none());
        assert_eq!(alpha.fragment_shader, Some("alphaTestedPS"));

        let sky = PipelineKind::Skybox.desc();
        assert!(sky.cull_mode.is_none());
        assert_eq!(sky.depth_compare, wgpu::CompareFunction::LessEqual);

        let transparent = PipelineKind::Transparent.desc();
        assert!(transparent.blend.is_some());
        assert!(transparent.depth_write);

        let opaque = PipelineKind::Opaque.desc();
        assert_eq!(opaque.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(opaque.depth_compare, wgpu::CompareFunction::Less);
    }
}
