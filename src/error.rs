use thiserror::Error;

/// Failures surfaced by the buffer publication path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("{label} needs {requested} bytes but the device allows at most {limit}")]
    ExceedsDeviceLimit {
        label: &'static str,
        requested: u64,
        limit: u64,
    },

    #[error("failed to allocate {label} ({requested} bytes): {reason}")]
    Allocation {
        label: &'static str,
        requested: u64,
        reason: String,
    },

    #[error("failed to read back {label}: {reason}")]
    Readback { label: &'static str, reason: String },

    #[error("splat generator has not been activated")]
    Inactive,

    #[error("no buffers are bound for a frame of {count} splats")]
    Unbound { count: usize },

    #[error("splat buffers have been disposed")]
    Disposed,
}

/// Failures while acquiring a graphics device.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error(transparent)]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}
