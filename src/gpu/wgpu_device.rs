use super::{BufferDevice, GpuBuffer};
use crate::{
    data::SplatAttribute,
    error::{DeviceError, PublishError},
};
use futures::{channel::oneshot, executor::block_on};
use std::sync::Arc;
use wgpu::{
    Adapter, Buffer, BufferDescriptor, BufferUsages, CommandEncoderDescriptor, Device,
    DeviceDescriptor, ErrorFilter, Features, Instance, Limits, Maintain, MapMode, PowerPreference,
    Queue, RequestAdapterOptions,
};

/// Shareable handle to a storage buffer.
///
/// Renderers bind it with [`WgpuBuffer::raw`]; dropping a clone never frees the buffer.
#[derive(Debug, Clone)]
pub struct WgpuBuffer {
    buffer: Arc<Buffer>,
    attribute: SplatAttribute,
}

impl WgpuBuffer {
    pub fn raw(&self) -> &Buffer {
        &self.buffer
    }

    pub fn attribute(&self) -> SplatAttribute {
        self.attribute
    }
}

impl GpuBuffer for WgpuBuffer {
    fn destroy(&self) {
        self.buffer.destroy();
    }

    fn size(&self) -> u64 {
        self.buffer.size()
    }
}

pub struct WgpuDevice {
    pub device: Device,
    pub queue: Queue,
}

impl WgpuDevice {
    /// Requests a headless, high performance device.
    pub async fn request() -> Result<Self, DeviceError> {
        let instance = Instance::default();
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or(DeviceError::NoAdapter)?;
        Self::from_adapter(&adapter).await
    }

    pub async fn from_adapter(adapter: &Adapter) -> Result<Self, DeviceError> {
        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("splatgen"),
                    features: Features::empty(),
                    limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;
        Ok(WgpuDevice { device, queue })
    }

    /// largest storage buffer this device will bind
    pub fn max_buffer_size(&self) -> u64 {
        let limits = self.device.limits();
        (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size)
    }
}

impl BufferDevice for WgpuDevice {
    type Buffer = WgpuBuffer;

    fn create_buffer(
        &self,
        attribute: SplatAttribute,
        count: usize,
    ) -> Result<WgpuBuffer, PublishError> {
        let label = attribute.label();
        let requested = attribute.byte_size(count);
        let limit = self.max_buffer_size();
        if requested > limit {
            return Err(PublishError::ExceedsDeviceLimit {
                label,
                requested,
                limit,
            });
        }

        self.device.push_error_scope(ErrorFilter::Validation);
        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        let buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size: requested,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let out_of_memory = block_on(self.device.pop_error_scope());
        let invalid = block_on(self.device.pop_error_scope());

        match out_of_memory.or(invalid) {
            Some(error) => {
                buffer.destroy();
                Err(PublishError::Allocation {
                    label,
                    requested,
                    reason: error.to_string(),
                })
            }
            None => Ok(WgpuBuffer {
                buffer: Arc::new(buffer),
                attribute,
            }),
        }
    }

    fn write_buffer(&self, buffer: &WgpuBuffer, data: &[u8]) {
        if !data.is_empty() {
            self.queue.write_buffer(buffer.raw(), 0, data);
        }
    }

    fn read_buffer(&self, buffer: &WgpuBuffer) -> Result<Vec<u8>, PublishError> {
        let size = buffer.size();
        if size == 0 {
            return Ok(Vec::new());
        }
        let label = buffer.attribute().label();

        let staging_buffer = self.device.create_buffer(&BufferDescriptor {
            size,
            label: Some("SplatField::staging_buffer"),
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut command_encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor { label: None });
        command_encoder.copy_buffer_to_buffer(buffer.raw(), 0, &staging_buffer, 0, size);
        self.queue.submit(Some(command_encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = oneshot::channel();
        buffer_slice.map_async(MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.device.poll(Maintain::Wait);

        let mapped = match block_on(receiver) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(error.to_string()),
            Err(_) => Err("mapping was cancelled".to_string()),
        };
        let result = mapped.map(|()| {
            let bytes = buffer_slice.get_mapped_range().to_vec();
            staging_buffer.unmap();
            bytes
        });
        staging_buffer.destroy();

        result.map_err(|reason| PublishError::Readback { label, reason })
    }
}
