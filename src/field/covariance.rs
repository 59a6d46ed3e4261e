use glam::Vec3;

/// Splits a symmetric 3x3 covariance into the two halves the renderer reads:
/// `part_0 = (xx, xy, xz)` and `part_1 = (yy, yz, zz)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovarianceParts {
    pub part_0: Vec3,
    pub part_1: Vec3,
}

impl CovarianceParts {
    /// reassembles the full symmetric matrix, row major
    pub fn to_matrix(self) -> [[f32; 3]; 3] {
        let (xx, xy, xz) = (self.part_0.x, self.part_0.y, self.part_0.z);
        let (yy, yz, zz) = (self.part_1.x, self.part_1.y, self.part_1.z);
        [[xx, xy, xz], [xy, yy, yz], [xz, yz, zz]]
    }
}

/// Isotropic covariance of a splat with the given size: `size²` on the diagonal, zero elsewhere.
pub fn encode(size: f32) -> CovarianceParts {
    let variance = size * size;
    CovarianceParts {
        part_0: Vec3::new(variance, 0., 0.),
        part_1: Vec3::new(variance, 0., variance),
    }
}
