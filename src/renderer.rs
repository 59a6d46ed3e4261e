use crate::gpu::GpuBuffer;

/// Handles to a populated buffer quartet, as handed to the renderer.
///
/// All four buffers hold exactly `count` elements with matching indices.
#[derive(Debug, Clone)]
pub struct ExternalBuffers<H: GpuBuffer> {
    pub position: H,
    pub color: H,
    pub covariance_0: H,
    pub covariance_1: H,
    pub count: usize,
}

/// The consuming side of the splat buffers.
///
/// Implementors keep the handles until they are rebound or released; destroying the buffers stays
/// the publisher's job.
pub trait SplatRenderer<H: GpuBuffer> {
    /// Called once per (re)creation of the quartet, after it holds valid data for the current frame.
    fn set_external_buffers(&mut self, buffers: &ExternalBuffers<H>);

    /// Called before the bound buffers are destroyed without a replacement.
    fn release_external_buffers(&mut self) {}
}
