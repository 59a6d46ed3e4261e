use crate::{
    error::PublishError,
    field::SplatFrame,
    gpu::{BufferDevice, BufferQuartet},
    renderer::ExternalBuffers,
};

pub enum PublisherState<D: BufferDevice> {
    /// no buffers are allocated
    Unbound,
    /// a quartet sized to the current splat count is allocated
    Bound(BufferQuartet<D::Buffer>),
    /// buffers have been released for good
    Disposed,
}

/// Owns the splat buffers and keeps them sized to the field.
pub struct BufferPublisher<D: BufferDevice> {
    device: D,
    state: PublisherState<D>,
}

impl<D: BufferDevice> Drop for BufferPublisher<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<D: BufferDevice> BufferPublisher<D> {
    pub fn new(device: D) -> Self {
        BufferPublisher {
            device,
            state: PublisherState::Unbound,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn state(&self) -> &PublisherState<D> {
        &self.state
    }

    pub fn quartet(&self) -> Option<&BufferQuartet<D::Buffer>> {
        match &self.state {
            PublisherState::Bound(quartet) => Some(quartet),
            _ => None,
        }
    }

    /// splat count of the bound quartet, `None` when unbound or disposed
    pub fn bound_count(&self) -> Option<usize> {
        self.quartet().map(BufferQuartet::count)
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, PublisherState::Disposed)
    }

    /// Replaces the current quartet with one sized for `count` splats.
    ///
    /// The old quartet is destroyed before the new one is allocated. A `count` of zero leaves the
    /// publisher unbound and returns `None`. On failure the publisher is left unbound.
    pub fn rebuild(
        &mut self,
        count: usize,
    ) -> Result<Option<ExternalBuffers<D::Buffer>>, PublishError> {
        if self.is_disposed() {
            return Err(PublishError::Disposed);
        }
        self.release();

        if count == 0 {
            log::debug!("splat field is empty, leaving buffers unbound");
            return Ok(None);
        }

        let quartet = BufferQuartet::allocate(&self.device, count)?;
        let handles = quartet.handles();
        self.state = PublisherState::Bound(quartet);
        Ok(Some(handles))
    }

    /// Uploads a frame into the bound buffers without reallocating them.
    ///
    /// # Panics
    ///
    /// If the frame's length differs from the bound count.
    pub fn upload(&self, frame: &SplatFrame) -> Result<(), PublishError> {
        match &self.state {
            PublisherState::Bound(quartet) => {
                quartet.write(&self.device, frame);
                Ok(())
            }
            PublisherState::Unbound if frame.is_empty() => Ok(()),
            PublisherState::Unbound => Err(PublishError::Unbound { count: frame.len() }),
            PublisherState::Disposed => Err(PublishError::Disposed),
        }
    }

    /// Destroys the bound quartet, if any, returning to the unbound state.
    pub fn release(&mut self) {
        if let PublisherState::Bound(quartet) =
            std::mem::replace(&mut self.state, PublisherState::Unbound)
        {
            log::debug!("releasing buffers of {} splats", quartet.count());
            drop(quartet);
        }
    }

    /// Releases every buffer and refuses further work. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.release();
        self.state = PublisherState::Disposed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::SplatAttribute,
        field::{Distribution, FrameParameters, Motion, SplatField},
        gpu::{BufferEvent, HostDevice},
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn frame(count: usize) -> SplatFrame {
        SplatField::seed(
            count,
            2.,
            Distribution::GoldenSpiral,
            &mut StdRng::seed_from_u64(0),
        )
        .frame(&FrameParameters {
            time: 0.,
            speed: 1.,
            size: 0.01,
            motion: Motion::Orbit,
        })
    }

    #[test]
    fn starts_unbound() {
        let publisher = BufferPublisher::new(HostDevice::new());
        assert!(matches!(publisher.state(), PublisherState::Unbound));
        assert_eq!(publisher.bound_count(), None);
    }

    #[test]
    fn rebuild_binds_four_buffers() {
        let mut publisher = BufferPublisher::new(HostDevice::new());
        let handles = publisher.rebuild(16).unwrap().unwrap();
        assert_eq!(handles.count, 16);
        assert_eq!(publisher.bound_count(), Some(16));
        assert_eq!(publisher.device().live_buffers(), 4);
    }

    #[test]
    fn rebuild_destroys_old_quartet_first() {
        let mut publisher = BufferPublisher::new(HostDevice::new());
        publisher.rebuild(10).unwrap();
        publisher.rebuild(5).unwrap();

        let events = publisher.device().events();
        assert_eq!(events.len(), 12);
        assert!(events[4..8]
            .iter()
            .all(|event| matches!(event, BufferEvent::Destroyed { .. })));
        assert!(events[8..]
            .iter()
            .all(|event| matches!(event, BufferEvent::Created { count: 5, .. })));
        assert_eq!(publisher.device().live_buffers(), 4);
    }

    #[test]
    fn rebuild_to_zero_leaves_publisher_unbound() {
        let mut publisher = BufferPublisher::new(HostDevice::new());
        publisher.rebuild(10).unwrap();
        assert!(publisher.rebuild(0).unwrap().is_none());
        assert!(matches!(publisher.state(), PublisherState::Unbound));
        assert_eq!(publisher.device().live_buffers(), 0);
        assert!(publisher.upload(&SplatFrame::default()).is_ok());
    }

    #[test]
    fn failed_rebuild_keeps_nothing() {
        let budget = crate::data::quartet_byte_size(10);
        let mut publisher = BufferPublisher::new(HostDevice::with_memory_budget(budget));
        publisher.rebuild(10).unwrap();
        assert!(publisher.rebuild(11).is_err());
        assert!(matches!(publisher.state(), PublisherState::Unbound));
        assert_eq!(publisher.device().live_buffers(), 0);
    }

    #[test]
    fn upload_writes_in_place() {
        let mut publisher = BufferPublisher::new(HostDevice::new());
        publisher.rebuild(4).unwrap();
        let created = publisher.device().created_buffers();

        let frame = frame(4);
        publisher.upload(&frame).unwrap();
        publisher.upload(&frame).unwrap();
        assert_eq!(publisher.device().created_buffers(), created);

        let quartet = publisher.quartet().unwrap();
        let positions = publisher
            .device()
            .read_buffer(quartet.buffer(SplatAttribute::Position))
            .unwrap();
        assert_eq!(positions, bytemuck::cast_slice::<_, u8>(&frame.positions));
    }

    #[test]
    fn upload_without_buffers_is_rejected() {
        let publisher = BufferPublisher::new(HostDevice::new());
        assert_eq!(
            publisher.upload(&frame(3)),
            Err(PublishError::Unbound { count: 3 })
        );
    }

    #[test]
    fn dispose_is_terminal_and_idempotent() {
        let mut publisher = BufferPublisher::new(HostDevice::new());
        publisher.rebuild(8).unwrap();
        publisher.dispose();
        publisher.dispose();
        assert!(publisher.is_disposed());
        assert_eq!(publisher.device().live_buffers(), 0);
        assert_eq!(publisher.device().destroyed_buffers(), 4);
        assert_eq!(publisher.rebuild(8).err(), Some(PublishError::Disposed));
        assert_eq!(publisher.upload(&frame(8)), Err(PublishError::Disposed));
    }

    #[test]
    fn dispose_from_unbound_is_safe() {
        let mut publisher = BufferPublisher::new(HostDevice::new());
        publisher.dispose();
        assert!(publisher.is_disposed());
        assert_eq!(publisher.device().created_buffers(), 0);
    }
}
