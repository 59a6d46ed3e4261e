use crate::{
    config::SplatFieldDescriptor,
    error::PublishError,
    field::{FrameParameters, SplatField, SplatFrame},
    gpu::BufferDevice,
    publisher::BufferPublisher,
    renderer::SplatRenderer,
};
use rand::{rngs::StdRng, SeedableRng};

/// Host-facing splat generator.
///
/// The embedding application calls [`activate`](Self::activate) once, [`tick`](Self::tick) every
/// frame and [`deactivate`](Self::deactivate) on teardown; dropping the generator deactivates it.
/// Descriptor changes take effect on the next tick: a new count re-creates and re-binds the
/// buffers, a new radius or distribution re-seeds the base positions in place.
pub struct SplatGenerator<D: BufferDevice, R: SplatRenderer<D::Buffer>> {
    descriptor: SplatFieldDescriptor,
    field: SplatField,
    publisher: BufferPublisher<D>,
    renderer: R,
    rng: StdRng,
    active: bool,
}

impl<D: BufferDevice, R: SplatRenderer<D::Buffer>> Drop for SplatGenerator<D, R> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl<D: BufferDevice, R: SplatRenderer<D::Buffer>> SplatGenerator<D, R> {
    pub fn new(device: D, renderer: R, descriptor: SplatFieldDescriptor) -> Self {
        let rng = match descriptor.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        SplatGenerator {
            descriptor,
            field: SplatField::default(),
            publisher: BufferPublisher::new(device),
            renderer,
            rng,
            active: false,
        }
    }

    pub fn descriptor(&self) -> &SplatFieldDescriptor {
        &self.descriptor
    }

    /// Mutable access to the parameters; changes are picked up by the next tick.
    pub fn descriptor_mut(&mut self) -> &mut SplatFieldDescriptor {
        &mut self.descriptor
    }

    pub fn field(&self) -> &SplatField {
        &self.field
    }

    pub fn publisher(&self) -> &BufferPublisher<D> {
        &self.publisher
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The frame a tick at `time` publishes, recomputed from the current base positions.
    pub fn frame_at(&self, time: f32) -> SplatFrame {
        self.field.frame(&FrameParameters {
            time,
            speed: self.descriptor.speed,
            size: self.descriptor.size,
            motion: self.descriptor.motion,
        })
    }

    /// Seeds the field, allocates the buffers, uploads the frame for `time` and binds the renderer.
    ///
    /// Activating an active generator re-creates everything from scratch.
    pub fn activate(&mut self, time: f32) -> Result<(), PublishError> {
        if self.publisher.is_disposed() {
            return Err(PublishError::Disposed);
        }
        log::info!(
            "activating splat field: {} splats, radius {}, {:?} distribution, {:?} motion",
            self.descriptor.count,
            self.descriptor.radius,
            self.descriptor.distribution,
            self.descriptor.motion
        );
        self.recreate(time)?;
        self.active = true;
        Ok(())
    }

    /// Recomputes the frame for `time` and uploads it into the bound buffers.
    ///
    /// On error the previous frame's data stays in the buffers.
    pub fn tick(&mut self, time: f32) -> Result<(), PublishError> {
        if self.publisher.is_disposed() {
            return Err(PublishError::Disposed);
        }
        if !self.active {
            return Err(PublishError::Inactive);
        }

        if self.field.len() != self.descriptor.count {
            log::info!(
                "splat count changed from {} to {}",
                self.field.len(),
                self.descriptor.count
            );
            return self.recreate(time);
        }
        if self.field.radius() != self.descriptor.radius
            || self.field.distribution() != self.descriptor.distribution
        {
            self.reseed();
        }

        log::trace!("uploading {} splats at t={time}", self.field.len());
        self.publisher.upload(&self.frame_at(time))
    }

    /// Releases the renderer's binding and destroys the buffers. Safe to call more than once.
    pub fn deactivate(&mut self) {
        if self.publisher.is_disposed() {
            return;
        }
        if self.publisher.bound_count().is_some() {
            self.renderer.release_external_buffers();
        }
        self.publisher.dispose();
        self.active = false;
        log::info!("splat field deactivated");
    }

    fn reseed(&mut self) {
        log::debug!(
            "seeding {} base positions ({:?}, radius {})",
            self.descriptor.count,
            self.descriptor.distribution,
            self.descriptor.radius
        );
        self.field = SplatField::seed(
            self.descriptor.count,
            self.descriptor.radius,
            self.descriptor.distribution,
            &mut self.rng,
        );
    }

    fn recreate(&mut self, time: f32) -> Result<(), PublishError> {
        let was_bound = self.publisher.bound_count().is_some();
        if was_bound && self.descriptor.count == 0 {
            self.renderer.release_external_buffers();
        }
        self.reseed();

        match self.publisher.rebuild(self.field.len()) {
            Ok(Some(buffers)) => {
                self.publisher.upload(&self.frame_at(time))?;
                self.renderer.set_external_buffers(&buffers);
                log::info!("bound {} splats to the renderer", buffers.count);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(error) => {
                if was_bound {
                    self.renderer.release_external_buffers();
                }
                // an empty field makes the next tick retry the allocation
                self.field = SplatField::default();
                Err(error)
            }
        }
    }
}
