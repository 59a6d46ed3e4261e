//! Synthetic splat field generator publishing position, colour and covariance buffers for an
//! external renderer.

pub mod config;
pub mod data;
pub mod error;
pub mod field;
pub mod generator;
pub mod gpu;
pub mod publisher;
pub mod renderer;

pub use config::{Config, SplatFieldDescriptor};
pub use error::{DeviceError, PublishError};
pub use generator::SplatGenerator;
pub use renderer::{ExternalBuffers, SplatRenderer};
