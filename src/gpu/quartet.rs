use super::{BufferDevice, GpuBuffer, OwnedBuffer};
use crate::{
    data::SplatAttribute, error::PublishError, field::SplatFrame, renderer::ExternalBuffers,
};

/// The four splat buffers, allocated together and destroyed together.
///
/// Either all four allocations succeed or none of them survive: a failure part way through drops
/// the buffers created so far before the error is returned.
pub struct BufferQuartet<H: GpuBuffer> {
    count: usize,
    position: OwnedBuffer<H>,
    color: OwnedBuffer<H>,
    covariance_0: OwnedBuffer<H>,
    covariance_1: OwnedBuffer<H>,
}

impl<H: GpuBuffer> BufferQuartet<H> {
    pub fn allocate<D: BufferDevice<Buffer = H>>(
        device: &D,
        count: usize,
    ) -> Result<Self, PublishError> {
        let position = OwnedBuffer::allocate(device, SplatAttribute::Position, count)?;
        let color = OwnedBuffer::allocate(device, SplatAttribute::Color, count)?;
        let covariance_0 = OwnedBuffer::allocate(device, SplatAttribute::CovariancePart0, count)?;
        let covariance_1 = OwnedBuffer::allocate(device, SplatAttribute::CovariancePart1, count)?;

        Ok(BufferQuartet {
            count,
            position,
            color,
            covariance_0,
            covariance_1,
        })
    }

    /// number of splats every buffer holds
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn buffer(&self, attribute: SplatAttribute) -> &H {
        match attribute {
            SplatAttribute::Position => self.position.handle(),
            SplatAttribute::Color => self.color.handle(),
            SplatAttribute::CovariancePart0 => self.covariance_0.handle(),
            SplatAttribute::CovariancePart1 => self.covariance_1.handle(),
        }
    }

    /// Read-only handles for the renderer.
    pub fn handles(&self) -> ExternalBuffers<H> {
        ExternalBuffers {
            position: self.position.handle().clone(),
            color: self.color.handle().clone(),
            covariance_0: self.covariance_0.handle().clone(),
            covariance_1: self.covariance_1.handle().clone(),
            count: self.count,
        }
    }

    /// Uploads a whole frame in place.
    ///
    /// # Panics
    ///
    /// If the frame's length differs from the quartet's element count.
    pub fn write<D: BufferDevice<Buffer = H>>(&self, device: &D, frame: &SplatFrame) {
        assert_eq!(
            frame.len(),
            self.count,
            "frame of {} splats uploaded into buffers sized for {}",
            frame.len(),
            self.count
        );

        device.write_buffer(
            self.position.handle(),
            bytemuck::cast_slice(&frame.positions),
        );
        device.write_buffer(self.color.handle(), bytemuck::cast_slice(&frame.colors));
        device.write_buffer(
            self.covariance_0.handle(),
            bytemuck::cast_slice(&frame.covariance_0),
        );
        device.write_buffer(
            self.covariance_1.handle(),
            bytemuck::cast_slice(&frame.covariance_1),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::quartet_byte_size,
        gpu::{BufferEvent, HostDevice},
    };
    use glam::{Vec3, Vec4};

    fn frame(count: usize) -> SplatFrame {
        SplatFrame {
            positions: vec![Vec3::new(1., 2., 3.); count],
            colors: vec![Vec4::new(0.1, 0.2, 0.3, 1.); count],
            covariance_0: vec![Vec3::new(4., 0., 0.); count],
            covariance_1: vec![Vec3::new(4., 0., 4.); count],
        }
    }

    #[test]
    fn allocates_four_buffers_with_fixed_strides() {
        let device = HostDevice::new();
        let quartet = BufferQuartet::allocate(&device, 8).unwrap();
        assert_eq!(device.live_buffers(), 4);
        assert_eq!(quartet.buffer(SplatAttribute::Position).size(), 96);
        assert_eq!(quartet.buffer(SplatAttribute::Color).size(), 128);
        assert_eq!(quartet.buffer(SplatAttribute::CovariancePart0).size(), 96);
        assert_eq!(quartet.buffer(SplatAttribute::CovariancePart1).size(), 96);
    }

    #[test]
    fn dropping_releases_every_buffer() {
        let device = HostDevice::new();
        let quartet = BufferQuartet::allocate(&device, 8).unwrap();
        drop(quartet);
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.destroyed_buffers(), 4);
    }

    #[test]
    fn partial_failure_leaves_nothing_allocated() {
        // one byte short of the last covariance part
        let device = HostDevice::with_memory_budget(quartet_byte_size(100) - 1);
        let error = BufferQuartet::allocate(&device, 100).err().unwrap();
        assert!(matches!(error, PublishError::Allocation { .. }));
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.created_buffers(), 3);
        assert_eq!(device.destroyed_buffers(), 3);
    }

    #[test]
    fn device_limit_failure_leaves_nothing_allocated() {
        // positions fit in 12 * 100 bytes, colours need 16 * 100
        let device = HostDevice::with_max_buffer_size(1500);
        let error = BufferQuartet::allocate(&device, 100).err().unwrap();
        assert_eq!(
            error,
            PublishError::ExceedsDeviceLimit {
                label: SplatAttribute::Color.label(),
                requested: 1600,
                limit: 1500,
            }
        );
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(
            device.events()[1],
            BufferEvent::Destroyed {
                id: 0,
                attribute: SplatAttribute::Position
            }
        );
        assert_eq!(device.destroyed_buffers(), 1);
    }

    #[test]
    fn write_uploads_every_array() {
        let device = HostDevice::new();
        let quartet = BufferQuartet::allocate(&device, 3).unwrap();
        let frame = frame(3);
        quartet.write(&device, &frame);

        let colors = device
            .read_buffer(quartet.buffer(SplatAttribute::Color))
            .unwrap();
        assert_eq!(colors, bytemuck::cast_slice::<Vec4, u8>(&frame.colors));
        let covariance_1 = device
            .read_buffer(quartet.buffer(SplatAttribute::CovariancePart1))
            .unwrap();
        assert_eq!(
            covariance_1,
            bytemuck::cast_slice::<Vec3, u8>(&frame.covariance_1)
        );
    }

    #[test]
    #[should_panic(expected = "uploaded into buffers sized for")]
    fn mismatched_frame_length_panics() {
        let device = HostDevice::new();
        let quartet = BufferQuartet::allocate(&device, 3).unwrap();
        quartet.write(&device, &frame(2));
    }

    #[test]
    fn handles_share_the_allocation() {
        let device = HostDevice::new();
        let quartet = BufferQuartet::allocate(&device, 5).unwrap();
        let handles = quartet.handles();
        assert_eq!(handles.count, 5);
        assert_eq!(device.live_buffers(), 4);
        drop(handles);
        assert_eq!(device.live_buffers(), 4);
    }
}
