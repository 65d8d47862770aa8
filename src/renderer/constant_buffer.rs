use std::marker::PhantomData;

use bytemuck::Pod;

/// Minimum offset alignment for uniform records bound with a dynamic offset.
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

pub const fn aligned_stride(size: u64) -> u64 {
    (size + CONSTANT_BUFFER_ALIGNMENT - 1) & !(CONSTANT_BUFFER_ALIGNMENT - 1)
}

/// CPU-side array of fixed-stride `T` records, mirrored to one GPU uniform
/// buffer. Record `i` lives at byte `i * stride()`.
#[derive(Clone)]
pub struct ConstantBuffer<T: Pod> {
    label: &'static str,
    bytes: Vec<u8>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> ConstantBuffer<T> {
    pub fn new(label: &'static str, len: usize) -> Self {
        let mut buffer = Self {
            label,
            bytes: Vec::new(),
            len: 0,
            _marker: PhantomData,
        };
        buffer.reallocate(len);
        buffer
    }

    pub const fn stride() -> u64 {
        aligned_stride(std::mem::size_of::<T>() as u64)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte size of the backing allocation. Never zero so the GPU buffer can
    /// always be created.
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn offset(&self, index: usize) -> u64 {
        assert!(
            index < self.len,
            "{}: record {} out of range ({} records)",
            self.label,
            index,
            self.len
        );
        index as u64 * Self::stride()
    }

    /// Discards every record and resizes to `len` zeroed records.
    pub fn reallocate(&mut self, len: usize) {
        let size = (len.max(1) as u64 * Self::stride()) as usize;
        self.bytes = vec![0; size];
        self.len = len;
        log::debug!(
            "{}: {} records of {} bytes (stride {})",
            self.label,
            len,
            std::mem::size_of::<T>(),
            Self::stride()
        );
    }

    pub fn write(&mut self, index: usize, record: &T) {
        let start = self.offset(index) as usize;
        let end = start + std::mem::size_of::<T>();
        self.bytes[start..end].copy_from_slice(bytemuck::bytes_of(record));
    }

    pub fn read(&self, index: usize) -> T {
        let start = self.offset(index) as usize;
        let end = start + std::mem::size_of::<T>();
        bytemuck::pod_read_unaligned(&self.bytes[start..end])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::constants::{MaterialConstants, ObjectConstants, PassConstants};

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(aligned_stride(1), 256);
        assert_eq!(aligned_stride(256), 256);
        assert_eq!(aligned_stride(257), 512);
        assert_eq!(ConstantBuffer::<ObjectConstants>::stride(), 256);
        assert_eq!(ConstantBuffer::<MaterialConstants>::stride(), 256);
        assert_eq!(ConstantBuffer::<PassConstants>::stride(), 1536);
    }

    #[test]
    fn records_land_at_index_times_stride() {
        let mut buffer = ConstantBuffer::<ObjectConstants>::new("objects", 3);
        let record = ObjectConstants::new(
            glam::Mat4::from_scale(glam::Vec3::splat(2.0)),
            glam::Mat4::IDENTITY,
        );
        buffer.write(2, &record);

        assert_eq!(buffer.offset(2), 512);
        assert_eq!(buffer.size_bytes(), 768);
        assert_eq!(buffer.read(2), record);
        assert!(buffer.as_bytes()[..512].iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic]
    fn out_of_range_record_panics() {
        let buffer = ConstantBuffer::<ObjectConstants>::new("objects", 1);
        buffer.offset(1);
    }

    #[test]
    fn empty_buffer_keeps_one_record_of_storage() {
        let buffer = ConstantBuffer::<ObjectConstants>::new("objects", 0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.size_bytes(), 256);
    }
}
