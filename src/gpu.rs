//! Graphics device seam: the buffer operations the publisher needs, and their implementations.

pub mod host;
pub mod quartet;
pub mod wgpu_device;

use crate::{data::SplatAttribute, error::PublishError};

pub use host::{BufferEvent, HostBuffer, HostDevice};
pub use quartet::BufferQuartet;
pub use wgpu_device::{WgpuBuffer, WgpuDevice};

/// A handle to one structured GPU buffer.
///
/// Clones refer to the same allocation; only [`GpuBuffer::destroy`] frees it.
pub trait GpuBuffer: Clone {
    fn destroy(&self);

    /// size of the allocation in bytes
    fn size(&self) -> u64;
}

/// Device able to allocate, fill and read back structured buffers.
pub trait BufferDevice {
    type Buffer: GpuBuffer;

    /// Allocates an uninitialised buffer of `count` elements of `attribute`'s stride.
    fn create_buffer(
        &self,
        attribute: SplatAttribute,
        count: usize,
    ) -> Result<Self::Buffer, PublishError>;

    /// Copies `data` to the start of `buffer`.
    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]);

    fn read_buffer(&self, buffer: &Self::Buffer) -> Result<Vec<u8>, PublishError>;
}

/// Sole owner of a buffer; destroys it when dropped.
pub struct OwnedBuffer<H: GpuBuffer> {
    attribute: SplatAttribute,
    handle: H,
}

impl<H: GpuBuffer> Drop for OwnedBuffer<H> {
    fn drop(&mut self) {
        log::debug!(
            "destroying {} ({} bytes)",
            self.attribute.label(),
            self.handle.size()
        );
        self.handle.destroy();
    }
}

impl<H: GpuBuffer> OwnedBuffer<H> {
    pub fn allocate<D: BufferDevice<Buffer = H>>(
        device: &D,
        attribute: SplatAttribute,
        count: usize,
    ) -> Result<Self, PublishError> {
        let handle = device.create_buffer(attribute, count)?;
        log::debug!("allocated {} ({} bytes)", attribute.label(), handle.size());
        Ok(OwnedBuffer { attribute, handle })
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}
