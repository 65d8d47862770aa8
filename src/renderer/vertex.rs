use bytemuck::{Pod, Zeroable};
use std::mem;

/// Static mesh vertex: position, normal, texture coordinate and tangent.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
}

impl Vertex {
    pub const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x3
    ];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Vertex of a skinned mesh. The fourth bone weight is implied as
/// `1 - sum(bone_weights)`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, Default, PartialEq)]
pub struct SkinnedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bone_weights: [f32; 3],
    pub bone_indices: [u8; 4],
}

impl SkinnedVertex {
    pub const ATTRS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x3,
        4 => Float32x3,
        5 => Uint8x4
    ];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<SkinnedVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Which of the two vertex formats a pipeline consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexLayoutKind {
    Standard,
    Skinned,
}

impl VertexLayoutKind {
    pub fn stride(self) -> u32 {
        match self {
            VertexLayoutKind::Standard => mem::size_of::<Vertex>() as u32,
            VertexLayoutKind::Skinned => mem::size_of::<SkinnedVertex>() as u32,
        }
    }

    pub fn layout<'a>(self) -> wgpu::VertexBufferLayout<'a> {
        match self {
            VertexLayoutKind::Standard => Vertex::layout(),
            VertexLayoutKind::Skinned => SkinnedVertex::layout(),
        }
    }
}

#[inline]
pub fn v(position: [f32; 3], normal: [f32; 3], uv: [f32; 2], tangent: [f32; 3]) -> Vertex {
    Vertex {
        position,
        normal,
        uv,
        tangent,
    }
}
