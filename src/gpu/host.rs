use super::{BufferDevice, GpuBuffer};
use crate::{data::SplatAttribute, error::PublishError};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

/// Entry in a [`HostDevice`]'s allocation ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    Created {
        id: u64,
        attribute: SplatAttribute,
        count: usize,
    },
    Destroyed {
        id: u64,
        attribute: SplatAttribute,
    },
}

#[derive(Debug, Default)]
struct Ledger {
    next_id: u64,
    live_bytes: u64,
    live_buffers: usize,
    events: Vec<BufferEvent>,
}

#[derive(Debug)]
struct Allocation {
    id: u64,
    attribute: SplatAttribute,
    count: usize,
    bytes: RefCell<Vec<u8>>,
    destroyed: Cell<bool>,
    ledger: Rc<RefCell<Ledger>>,
}

/// Buffer living in host memory.
#[derive(Debug, Clone)]
pub struct HostBuffer(Rc<Allocation>);

impl HostBuffer {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn attribute(&self) -> SplatAttribute {
        self.0.attribute
    }

    /// number of elements the buffer was created for
    pub fn count(&self) -> usize {
        self.0.count
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }
}

impl GpuBuffer for HostBuffer {
    fn destroy(&self) {
        let allocation = &self.0;
        if allocation.destroyed.replace(true) {
            return;
        }
        let size = allocation.bytes.borrow().len() as u64;
        allocation.bytes.borrow_mut().clear();

        let mut ledger = allocation.ledger.borrow_mut();
        ledger.live_bytes -= size;
        ledger.live_buffers -= 1;
        ledger.events.push(BufferEvent::Destroyed {
            id: allocation.id,
            attribute: allocation.attribute,
        });
    }

    fn size(&self) -> u64 {
        (self.0.attribute.stride() * self.0.count) as u64
    }
}

/// Device that keeps buffer contents in host memory and records every allocation.
///
/// Stands in for a GPU when none is available and lets the ownership rules of the quartet be
/// observed directly.
#[derive(Debug, Default)]
pub struct HostDevice {
    ledger: Rc<RefCell<Ledger>>,
    /// maximum number of bytes alive at once, `None` for unlimited
    memory_budget: Option<u64>,
    /// largest single buffer the device accepts, `None` for unlimited
    max_buffer_size: Option<u64>,
}

impl HostDevice {
    pub fn new() -> Self {
        HostDevice::default()
    }

    /// A device that fails allocations once `budget` live bytes would be exceeded.
    pub fn with_memory_budget(budget: u64) -> Self {
        HostDevice {
            memory_budget: Some(budget),
            ..Default::default()
        }
    }

    /// A device that rejects any single buffer larger than `limit` bytes.
    pub fn with_max_buffer_size(limit: u64) -> Self {
        HostDevice {
            max_buffer_size: Some(limit),
            ..Default::default()
        }
    }

    pub fn live_buffers(&self) -> usize {
        self.ledger.borrow().live_buffers
    }

    pub fn live_bytes(&self) -> u64 {
        self.ledger.borrow().live_bytes
    }

    pub fn events(&self) -> Vec<BufferEvent> {
        self.ledger.borrow().events.clone()
    }

    pub fn created_buffers(&self) -> usize {
        self.ledger
            .borrow()
            .events
            .iter()
            .filter(|event| matches!(event, BufferEvent::Created { .. }))
            .count()
    }

    pub fn destroyed_buffers(&self) -> usize {
        self.ledger
            .borrow()
            .events
            .iter()
            .filter(|event| matches!(event, BufferEvent::Destroyed { .. }))
            .count()
    }
}

impl BufferDevice for HostDevice {
    type Buffer = HostBuffer;

    fn create_buffer(
        &self,
        attribute: SplatAttribute,
        count: usize,
    ) -> Result<HostBuffer, PublishError> {
        let requested = attribute.byte_size(count);
        if let Some(limit) = self.max_buffer_size {
            if requested > limit {
                return Err(PublishError::ExceedsDeviceLimit {
                    label: attribute.label(),
                    requested,
                    limit,
                });
            }
        }
        let mut ledger = self.ledger.borrow_mut();

        if let Some(budget) = self.memory_budget {
            if ledger.live_bytes + requested > budget {
                return Err(PublishError::Allocation {
                    label: attribute.label(),
                    requested,
                    reason: format!(
                        "out of memory: {} of {} bytes already in use",
                        ledger.live_bytes, budget
                    ),
                });
            }
        }

        let id = ledger.next_id;
        ledger.next_id += 1;
        ledger.live_bytes += requested;
        ledger.live_buffers += 1;
        ledger.events.push(BufferEvent::Created {
            id,
            attribute,
            count,
        });

        Ok(HostBuffer(Rc::new(Allocation {
            id,
            attribute,
            count,
            bytes: RefCell::new(vec![0; requested as usize]),
            destroyed: Cell::new(false),
            ledger: self.ledger.clone(),
        })))
    }

    fn write_buffer(&self, buffer: &HostBuffer, data: &[u8]) {
        assert!(!buffer.is_destroyed(), "write into a destroyed buffer");
        let mut bytes = buffer.0.bytes.borrow_mut();
        assert!(
            data.len() <= bytes.len(),
            "{} bytes written into a {} byte buffer",
            data.len(),
            bytes.len()
        );
        bytes[..data.len()].copy_from_slice(data);
    }

    fn read_buffer(&self, buffer: &HostBuffer) -> Result<Vec<u8>, PublishError> {
        if buffer.is_destroyed() {
            return Err(PublishError::Readback {
                label: buffer.attribute().label(),
                reason: "buffer has been destroyed".to_string(),
            });
        }
        Ok(buffer.0.bytes.borrow().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_tracks_creation_and_destruction() {
        let device = HostDevice::new();
        let buffer = device.create_buffer(SplatAttribute::Color, 4).unwrap();
        assert_eq!(buffer.size(), 64);
        assert_eq!(device.live_bytes(), 64);

        buffer.destroy();
        buffer.destroy();
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.live_bytes(), 0);
        assert_eq!(
            device.events(),
            vec![
                BufferEvent::Created {
                    id: 0,
                    attribute: SplatAttribute::Color,
                    count: 4
                },
                BufferEvent::Destroyed {
                    id: 0,
                    attribute: SplatAttribute::Color
                },
            ]
        );
    }

    #[test]
    fn clones_share_contents() {
        let device = HostDevice::new();
        let buffer = device.create_buffer(SplatAttribute::Position, 1).unwrap();
        let alias = buffer.clone();
        device.write_buffer(&buffer, &[1; 12]);
        assert_eq!(device.read_buffer(&alias).unwrap(), vec![1; 12]);

        alias.destroy();
        assert!(buffer.is_destroyed());
        assert!(device.read_buffer(&buffer).is_err());
    }

    #[test]
    fn memory_budget_rejects_oversized_allocations() {
        let device = HostDevice::with_memory_budget(100);
        assert!(device.create_buffer(SplatAttribute::Position, 8).is_ok());
        let error = device
            .create_buffer(SplatAttribute::Position, 1)
            .unwrap_err();
        assert!(matches!(error, PublishError::Allocation { requested: 12, .. }));
        assert_eq!(device.live_buffers(), 1);
    }

    #[test]
    fn buffer_size_limit_rejects_large_buffers() {
        let device = HostDevice::with_max_buffer_size(48);
        let position = device.create_buffer(SplatAttribute::Position, 4).unwrap();
        assert_eq!(position.id(), 0);
        assert_eq!(
            device.create_buffer(SplatAttribute::Color, 4).unwrap_err(),
            PublishError::ExceedsDeviceLimit {
                label: "SplatField::color_buffer",
                requested: 64,
                limit: 48,
            }
        );
        // a rejected buffer never reaches the ledger
        assert_eq!(device.created_buffers(), 1);
        assert_eq!(device.live_bytes(), 48);
    }
}
