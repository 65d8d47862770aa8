/// Index storage for CPU-side meshes. Procedural shapes use 16-bit indices,
/// loaded meshes may need 32.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(indices) => indices.len(),
            IndexData::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            IndexData::U16(_) => wgpu::IndexFormat::Uint16,
            IndexData::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(indices) => bytemuck::cast_slice(indices),
            IndexData::U32(indices) => bytemuck::cast_slice(indices),
        }
    }

    pub fn get(&self, position: usize) -> Option<u32> {
        match self {
            IndexData::U16(indices) => indices.get(position).map(|&i| u32::from(i)),
            IndexData::U32(indices) => indices.get(position).copied(),
        }
    }

    /// Narrows to 16-bit indices when every value fits.
    pub fn compact(indices: Vec<u32>) -> Self {
        if indices.iter().all(|&i| i <= u32::from(u16::MAX)) {
            IndexData::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            IndexData::U32(indices)
        }
    }
}

/// Vertex and index arrays produced by a generator or loader, before any GPU
/// buffer exists.
#[derive(Clone, Debug)]
pub struct MeshData<V> {
    pub vertices: Vec<V>,
    pub indices: IndexData,
}

impl<V> MeshData<V> {
    pub fn new(vertices: Vec<V>, indices: IndexData) -> Self {
        Self { vertices, indices }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}
