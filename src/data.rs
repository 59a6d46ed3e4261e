use glam::{Vec3, Vec4};
use std::mem::size_of;

// glam's vector types are read straight into the buffers, so their sizes are the element strides
const _: () = assert!(size_of::<Vec3>() == 12);
const _: () = assert!(size_of::<Vec4>() == 16);

/// One of the four per-splat structured buffers handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplatAttribute {
    Position,
    Color,
    CovariancePart0,
    CovariancePart1,
}

impl SplatAttribute {
    /// Creation order of the quartet.
    pub const ALL: [SplatAttribute; 4] = [
        SplatAttribute::Position,
        SplatAttribute::Color,
        SplatAttribute::CovariancePart0,
        SplatAttribute::CovariancePart1,
    ];

    /// byte size of a single element: three packed `f32` for positions and covariance parts,
    /// four packed `f32` for colours
    pub const fn stride(self) -> usize {
        match self {
            SplatAttribute::Color => size_of::<Vec4>(),
            _ => size_of::<Vec3>(),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SplatAttribute::Position => "SplatField::position_buffer",
            SplatAttribute::Color => "SplatField::color_buffer",
            SplatAttribute::CovariancePart0 => "SplatField::covariance_0_buffer",
            SplatAttribute::CovariancePart1 => "SplatField::covariance_1_buffer",
        }
    }

    pub fn byte_size(self, count: usize) -> u64 {
        (self.stride() * count) as u64
    }
}

/// Total bytes a quartet of `count` splats occupies across all four buffers.
pub fn quartet_byte_size(count: usize) -> u64 {
    SplatAttribute::ALL
        .iter()
        .map(|attribute| attribute.byte_size(count))
        .sum()
}
