use clap::ValueEnum;
use glam::Vec3;
use rand::Rng;
use std::f32::consts::PI;

/// Angle between consecutive samples on the golden-angle spiral, `π(3 − √5)`.
pub const GOLDEN_ANGLE: f32 = PI * (3.0 - 2.236_068);

/// How base positions are spread over the cloud's bounding ball.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distribution {
    /// independent, uniformly distributed points inside the solid ball
    UniformBall,
    /// low-discrepancy golden-angle spiral with a cube-root randomised radius
    #[default]
    GoldenSpiral,
}

/// Produces `count` base positions inside a ball of the given `radius`.
///
/// A `count` of zero yields an empty field.
pub fn generate<R: Rng + ?Sized>(
    count: usize,
    radius: f32,
    distribution: Distribution,
    rng: &mut R,
) -> Vec<Vec3> {
    match distribution {
        Distribution::UniformBall => (0..count).map(|_| uniform_in_ball(radius, rng)).collect(),
        Distribution::GoldenSpiral => (0..count)
            .map(|index| {
                // cube root keeps the volumetric density uniform
                let u: f32 = rng.gen();
                golden_direction(index, count) * radius * u.cbrt()
            })
            .collect(),
    }
}

/// Unit direction of the `index`-th of `count` samples on the golden-angle spiral.
///
/// Depends only on `index` and `count`; +Y is the polar axis.
pub fn golden_direction(index: usize, count: usize) -> Vec3 {
    let t = if count > 1 {
        index as f32 / (count - 1) as f32
    } else {
        0.
    };
    let inclination = (1. - 2. * t).clamp(-1., 1.).acos();
    let azimuth = index as f32 * GOLDEN_ANGLE;

    let (sin_inclination, cos_inclination) = inclination.sin_cos();
    let (sin_azimuth, cos_azimuth) = azimuth.sin_cos();
    Vec3::new(
        sin_inclination * cos_azimuth,
        cos_inclination,
        sin_inclination * sin_azimuth,
    )
}

fn uniform_in_ball<R: Rng + ?Sized>(radius: f32, rng: &mut R) -> Vec3 {
    loop {
        let candidate = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if candidate.length_squared() <= 1. {
            return candidate * radius;
        }
    }
}
