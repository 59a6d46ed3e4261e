//! The synthetic splat field: frozen base positions and the per-frame arrays derived from them.

pub mod animation;
pub mod covariance;
pub mod sampler;

use glam::{Vec3, Vec4};
use rand::Rng;
use rayon::prelude::*;

pub use animation::Motion;
pub use sampler::Distribution;

/// Per-frame inputs of the animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParameters {
    /// elapsed time supplied by the host, in seconds
    pub time: f32,
    pub speed: f32,
    /// edge length of every splat, squared into its covariance
    pub size: f32,
    pub motion: Motion,
}

/// The rest pose of every splat, seeded once and replaced wholesale on re-seed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplatField {
    base_positions: Vec<Vec3>,
    radius: f32,
    distribution: Distribution,
}

impl SplatField {
    pub fn seed<R: Rng + ?Sized>(
        count: usize,
        radius: f32,
        distribution: Distribution,
        rng: &mut R,
    ) -> Self {
        SplatField {
            base_positions: sampler::generate(count, radius, distribution, rng),
            radius,
            distribution,
        }
    }

    pub fn len(&self) -> usize {
        self.base_positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base_positions.is_empty()
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    pub fn base_positions(&self) -> &[Vec3] {
        &self.base_positions
    }

    /// Recomputes all four per-splat arrays for one frame.
    ///
    /// Splats are evaluated in parallel but collected in index order, so the result is identical
    /// to a sequential evaluation.
    pub fn frame(&self, parameters: &FrameParameters) -> SplatFrame {
        let radius = self.radius;
        let (positions, colors): (Vec<Vec3>, Vec<Vec4>) = self
            .base_positions
            .par_iter()
            .map(|&base| {
                animation::evaluate(
                    base,
                    parameters.time,
                    parameters.speed,
                    radius,
                    parameters.motion,
                )
            })
            .unzip();

        let covariance = covariance::encode(parameters.size);
        let count = self.len();
        SplatFrame {
            positions,
            colors,
            covariance_0: vec![covariance.part_0; count],
            covariance_1: vec![covariance.part_1; count],
        }
    }
}

/// The four index-aligned arrays uploaded every tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplatFrame {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Vec4>,
    pub covariance_0: Vec<Vec3>,
    pub covariance_1: Vec<Vec3>,
}

impl SplatFrame {
    /// Number of splats; panics if the four arrays disagree.
    pub fn len(&self) -> usize {
        let count = self.positions.len();
        assert_eq!(self.colors.len(), count, "color array out of step with positions");
        assert_eq!(self.covariance_0.len(), count, "covariance part 0 out of step with positions");
        assert_eq!(self.covariance_1.len(), count, "covariance part 1 out of step with positions");
        count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
