pub mod binding;
pub mod command;
pub mod constant_buffer;
pub mod constants;
pub mod depth;
pub mod device;
pub mod draw;
pub mod frame;
mod internal;
pub mod pipeline;
pub mod pipeline_builder;
pub mod primitives;
pub mod shaders;
pub mod shadow_pass;
pub mod texture;
pub mod upload;
pub mod vertex;

pub use depth::Depth;
pub use device::{GraphicsDevice, RecordingDevice};
pub use frame::{run_frame, FrameState, MouseButtons, RenderApp};
pub use internal::WgpuDevice;
pub use pipeline_builder::PipelineBuilder;
pub use vertex::{SkinnedVertex, Vertex, VertexLayoutKind};
