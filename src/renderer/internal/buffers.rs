use std::mem;
use std::num::NonZeroU64;

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use crate::renderer::constant_buffer::ConstantBuffer;
use crate::renderer::constants::{
    MaterialConstants, ObjectConstants, PassConstants, SkinnedConstants,
};
use crate::renderer::upload::FrameConstants;
use crate::scene::{GeometryRegistry, MeshBuffers};

/// Static vertex/index pair built once from a registry buffer record.
pub(crate) struct GeometryBuffers {
    pub(crate) vertex: wgpu::Buffer,
    pub(crate) index: wgpu::Buffer,
    pub(crate) index_format: wgpu::IndexFormat,
}

impl GeometryBuffers {
    fn new(device: &wgpu::Device, mesh: &MeshBuffers) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}VertexBuffer", mesh.name)),
            contents: &mesh.vertex_data,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}IndexBuffer", mesh.name)),
            contents: mesh.indices.as_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex,
            index,
            index_format: mesh.indices.format(),
        }
    }

    /// One entry per registry buffer record, in handle order.
    pub(crate) fn create_all(device: &wgpu::Device, registry: &GeometryRegistry) -> Vec<Self> {
        let buffers: Vec<Self> = registry
            .buffers()
            .map(|(_, mesh)| Self::new(device, mesh))
            .collect();
        log::info!(
            "Uploaded {} vertex/index buffer pairs for {} geometries",
            buffers.len(),
            registry.len()
        );
        buffers
    }
}

/// One uniform buffer bound with a dynamic offset per record.
struct UniformArray {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl UniformArray {
    fn new(device: &wgpu::Device, label: &'static str, size: u64) -> Self {
        Self {
            label,
            buffer: Self::allocate(device, label, size),
            capacity: size,
        }
    }

    fn allocate(device: &wgpu::Device, label: &'static str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Returns true when the buffer had to be recreated.
    fn write<T: Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        records: &ConstantBuffer<T>,
    ) -> bool {
        let required = records.size_bytes();
        let grown = required > self.capacity;
        if grown {
            let new_capacity = required.max(self.capacity * 2);
            log::info!(
                "Growing {} buffer: {} -> {} bytes",
                self.label,
                self.capacity,
                new_capacity
            );
            self.buffer = Self::allocate(device, self.label, new_capacity);
            self.capacity = new_capacity;
        }
        queue.write_buffer(&self.buffer, 0, records.as_bytes());
        grown
    }

    fn binding(&self, record_size: u64) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: NonZeroU64::new(record_size),
        })
    }
}

fn uniform_entry(binding: u32, record_size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: true,
            min_binding_size: NonZeroU64::new(record_size as u64),
        },
        count: None,
    }
}

/// Group 0: the object, material, pass and skinned constant arrays. Each is
/// bound one record wide and addressed with a dynamic offset per draw.
pub(crate) struct FrameUniforms {
    objects: UniformArray,
    materials: UniformArray,
    passes: UniformArray,
    skinned: UniformArray,
    pub(crate) bind_layout: wgpu::BindGroupLayout,
    pub(crate) bind_group: wgpu::BindGroup,
}

impl FrameUniforms {
    pub(crate) fn new(device: &wgpu::Device, constants: &FrameConstants) -> Self {
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("FrameUniformsBindLayout"),
            entries: &[
                uniform_entry(0, mem::size_of::<ObjectConstants>()),
                uniform_entry(1, mem::size_of::<MaterialConstants>()),
                uniform_entry(2, mem::size_of::<PassConstants>()),
                uniform_entry(3, mem::size_of::<SkinnedConstants>()),
            ],
        });

        let objects = UniformArray::new(device, "ObjectConstants", constants.objects.size_bytes());
        let materials =
            UniformArray::new(device, "MaterialConstants", constants.materials.size_bytes());
        let passes = UniformArray::new(device, "PassConstants", constants.passes.size_bytes());
        let skinned =
            UniformArray::new(device, "SkinnedConstants", constants.skinned.size_bytes());

        let bind_group =
            Self::create_bind_group(device, &bind_layout, &objects, &materials, &passes, &skinned);

        Self {
            objects,
            materials,
            passes,
            skinned,
            bind_layout,
            bind_group,
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        objects: &UniformArray,
        materials: &UniformArray,
        passes: &UniformArray,
        skinned: &UniformArray,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("FrameUniformsBindGroup"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: objects.binding(mem::size_of::<ObjectConstants>() as u64),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: materials.binding(mem::size_of::<MaterialConstants>() as u64),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: passes.binding(mem::size_of::<PassConstants>() as u64),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: skinned.binding(mem::size_of::<SkinnedConstants>() as u64),
                },
            ],
        })
    }

    /// Copies every CPU mirror; the bind group is rebuilt if any buffer grew.
    pub(crate) fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        constants: &FrameConstants,
    ) {
        let mut grown = self.objects.write(device, queue, &constants.objects);
        grown |= self.materials.write(device, queue, &constants.materials);
        grown |= self.passes.write(device, queue, &constants.passes);
        grown |= self.skinned.write(device, queue, &constants.skinned);

        if grown {
            self.bind_group = Self::create_bind_group(
                device,
                &self.bind_layout,
                &self.objects,
                &self.materials,
                &self.passes,
                &self.skinned,
            );
        }
    }
}
