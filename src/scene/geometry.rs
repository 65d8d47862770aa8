use bytemuck::Pod;

use crate::asset::{AssetCache, Handle, IndexData, MeshData};

/// CPU copy of one vertex/index buffer pair, kept so the device can build the
/// static GPU buffers once.
#[derive(Debug, Clone)]
pub struct MeshBuffers {
    pub name: String,
    pub vertex_data: Vec<u8>,
    pub vertex_stride: u32,
    pub vertex_count: u32,
    pub indices: IndexData,
}

/// Draw parameters for a named mesh or submesh. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub name: String,
    pub buffers: Handle<MeshBuffers>,
    pub vertex_stride: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
    pub index_format: wgpu::IndexFormat,
}

pub type GeometryHandle = Handle<Geometry>;

/// Index range inside a shared buffer pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmeshRange {
    pub name: String,
    pub start_index: u32,
    pub index_count: u32,
    pub base_vertex: i32,
}

#[derive(Default)]
pub struct GeometryRegistry {
    buffers: AssetCache<MeshBuffers>,
    geometries: AssetCache<Geometry>,
}

impl GeometryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mesh with its own buffer pair covering every index.
    pub fn register<V: Pod>(&mut self, name: &str, mesh: &MeshData<V>) -> GeometryHandle {
        if let Some(existing) = self.geometries.find(name) {
            log::warn!("Geometry '{}' registered twice, keeping the first", name);
            return existing;
        }

        let buffers = self.insert_buffers(name, mesh);
        let record = &self.buffers.values()[buffers.index()];
        let geometry = Geometry {
            name: name.to_string(),
            buffers,
            vertex_stride: record.vertex_stride,
            vertex_count: record.vertex_count,
            index_count: record.indices.len() as u32,
            start_index: 0,
            base_vertex: 0,
            index_format: record.indices.format(),
        };

        self.geometries.insert(name, geometry)
    }

    /// Registers one buffer pair and a geometry per submesh range.
    pub fn register_shared<V: Pod>(
        &mut self,
        name: &str,
        mesh: &MeshData<V>,
        ranges: &[SubmeshRange],
    ) -> Vec<GeometryHandle> {
        let buffers = self.insert_buffers(name, mesh);
        let record = &self.buffers.values()[buffers.index()];
        let (stride, vertex_count, total, format) = (
            record.vertex_stride,
            record.vertex_count,
            record.indices.len() as u32,
            record.indices.format(),
        );

        ranges
            .iter()
            .map(|range| {
                assert!(
                    range.start_index + range.index_count <= total,
                    "submesh '{}' reads past the shared index buffer",
                    range.name
                );

                let geometry = Geometry {
                    name: range.name.clone(),
                    buffers,
                    vertex_stride: stride,
                    vertex_count,
                    index_count: range.index_count,
                    start_index: range.start_index,
                    base_vertex: range.base_vertex,
                    index_format: format,
                };
                self.geometries.insert(range.name.as_str(), geometry)
            })
            .collect()
    }

    fn insert_buffers<V: Pod>(&mut self, name: &str, mesh: &MeshData<V>) -> Handle<MeshBuffers> {
        let record = MeshBuffers {
            name: name.to_string(),
            vertex_data: bytemuck::cast_slice(&mesh.vertices).to_vec(),
            vertex_stride: std::mem::size_of::<V>() as u32,
            vertex_count: mesh.vertices.len() as u32,
            indices: mesh.indices.clone(),
        };
        self.buffers.insert(name, record)
    }

    pub fn get(&self, name: &str) -> Option<GeometryHandle> {
        self.geometries.find(name)
    }

    pub fn geometry(&self, handle: GeometryHandle) -> &Geometry {
        self.geometries
            .get(handle)
            .unwrap_or_else(|| panic!("unknown geometry handle {:?}", handle))
    }

    pub fn iter(&self) -> impl Iterator<Item = (GeometryHandle, &Geometry)> {
        self.geometries.iter()
    }

    pub fn buffers(&self) -> impl Iterator<Item = (Handle<MeshBuffers>, &MeshBuffers)> {
        self.buffers.iter()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::primitives::box_mesh;

    #[test]
    fn register_exposes_full_draw_range() {
        let mut registry = GeometryRegistry::new();
        let handle = registry.register("Box", &box_mesh(1.0, 1.0, 1.0, 0));
        let geometry = registry.geometry(handle);

        assert_eq!(registry.get("Box"), Some(handle));
        assert_eq!(geometry.index_count, 36);
        assert_eq!(geometry.start_index, 0);
        assert_eq!(geometry.base_vertex, 0);
        assert_eq!(geometry.vertex_stride, 44);
        assert_eq!(geometry.index_format, wgpu::IndexFormat::Uint16);
    }

    #[test]
    fn shared_submeshes_point_at_one_buffer_pair() {
        let mut registry = GeometryRegistry::new();
        let mesh = box_mesh(1.0, 1.0, 1.0, 0);
        let handles = registry.register_shared(
            "model",
            &mesh,
            &[
                SubmeshRange {
                    name: "sm_0".into(),
                    start_index: 0,
                    index_count: 18,
                    base_vertex: 0,
                },
                SubmeshRange {
                    name: "sm_1".into(),
                    start_index: 18,
                    index_count: 18,
                    base_vertex: 12,
                },
            ],
        );

        assert_eq!(registry.buffer_count(), 1);
        let second = registry.geometry(handles[1]);
        assert_eq!(second.start_index, 18);
        assert_eq!(second.base_vertex, 12);
        assert_eq!(second.buffers, registry.geometry(handles[0]).buffers);
    }

    #[test]
    fn missing_name_is_absent() {
        let registry = GeometryRegistry::new();
        assert!(registry.get("Skull").is_none());
    }
}
