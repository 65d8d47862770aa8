mod buffers;
mod context;
mod pipeline;
mod replay;
mod shadows;
mod textures;
mod wgpu_device;

pub(crate) use buffers::{FrameUniforms, GeometryBuffers};
pub(crate) use context::RenderContext;
pub(crate) use pipeline::{PipelineLayouts, RenderPipelines};
pub(crate) use shadows::ShadowMap;
pub(crate) use textures::TextureHeap;
pub use wgpu_device::WgpuDevice;
