use crate::field::{Distribution, Motion};
use clap::{Parser, ValueEnum};
use std::ops::RangeInclusive;

/// upper bound on the number of splats a field may hold
pub const MAX_SPLATS: usize = 100_000;
pub const SIZE_RANGE: RangeInclusive<f32> = 0.001..=1.;
pub const RADIUS_RANGE: RangeInclusive<f32> = 0.1..=100.;
pub const SPEED_RANGE: RangeInclusive<f32> = 0.0..=10.;

#[derive(Debug, Clone, PartialEq)]
pub struct SplatFieldDescriptor {
    /// number of splats in the field
    pub count: usize,
    /// edge length of every splat; its square is the covariance diagonal
    pub size: f32,
    /// radius of the ball the field is distributed over, also the colour normalisation range
    pub radius: f32,
    /// angular speed multiplier of the orbit motion
    pub speed: f32,
    pub distribution: Distribution,
    pub motion: Motion,
    /// seed of the base position sampler, `None` to seed from entropy
    pub seed: Option<u64>,
}

impl Default for SplatFieldDescriptor {
    fn default() -> Self {
        SplatFieldDescriptor {
            count: 10_000,
            size: 0.01,
            radius: 2.,
            speed: 1.,
            distribution: Distribution::default(),
            motion: Motion::default(),
            seed: None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// use a GPU when one is available, host memory otherwise
    Auto,
    Wgpu,
    Host,
}

/// `splatgen` - publishes a synthetic, animated splat field into GPU buffers.
///
/// Drives the generator headlessly for a fixed number of frames so a renderer's external buffer
/// path can be exercised without an authored asset.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Number of splats, clamped to 0..=100000.
    #[arg(long, env = "SPLATGEN_COUNT", allow_negative_numbers = true, default_value_t = 10_000)]
    pub count: i64,

    /// Splat size, clamped to 0.001..=1.
    #[arg(long, env = "SPLATGEN_SIZE", allow_negative_numbers = true, default_value_t = 0.01)]
    pub size: f32,

    /// Cloud radius, clamped to 0.1..=100.
    #[arg(long, env = "SPLATGEN_RADIUS", allow_negative_numbers = true, default_value_t = 2.)]
    pub radius: f32,

    /// Animation speed, clamped to 0..=10.
    #[arg(long, env = "SPLATGEN_SPEED", allow_negative_numbers = true, default_value_t = 1.)]
    pub speed: f32,

    #[arg(long, value_enum, default_value_t = Distribution::GoldenSpiral)]
    pub distribution: Distribution,

    #[arg(long, value_enum, default_value_t = Motion::Orbit)]
    pub motion: Motion,

    /// Seed for the base positions; omitted seeds come from entropy.
    #[arg(long, env = "SPLATGEN_SEED")]
    pub seed: Option<u64>,

    /// Number of frames to tick before deactivating.
    #[arg(long, default_value_t = 240)]
    pub frames: u32,

    /// Simulated frames per second, turning frame indices into elapsed time.
    #[arg(long, default_value_t = 60., value_parser = parse_frame_rate)]
    pub frame_rate: f32,

    /// Frame at which the splat count changes to `--resize-to`.
    #[arg(long, requires = "resize_to")]
    pub resize_at: Option<u32>,

    /// Splat count applied at `--resize-at`.
    #[arg(long, requires = "resize_at", allow_negative_numbers = true)]
    pub resize_to: Option<i64>,

    #[arg(long, value_enum, env = "SPLATGEN_BACKEND", default_value_t = Backend::Auto)]
    pub backend: Backend,

    /// Read the buffers back after every frame and compare them to a recomputed frame.
    #[arg(long)]
    pub verify: bool,
}

fn parse_frame_rate(value: &str) -> Result<f32, String> {
    let rate: f32 = value.parse().map_err(|_| format!("`{value}` is not a number"))?;
    if rate.is_finite() && rate >= 1. {
        Ok(rate)
    } else {
        Err("frame rate must be at least 1".to_string())
    }
}

impl Config {
    pub fn descriptor(&self) -> SplatFieldDescriptor {
        SplatFieldDescriptor {
            count: clamp_count(self.count),
            size: clamp_to("size", self.size, SIZE_RANGE),
            radius: clamp_to("radius", self.radius, RADIUS_RANGE),
            speed: clamp_to("speed", self.speed, SPEED_RANGE),
            distribution: self.distribution,
            motion: self.motion,
            seed: self.seed,
        }
    }
}

/// Clamps a raw splat count into `0..=MAX_SPLATS`; non-positive counts become an empty field.
pub fn clamp_count(count: i64) -> usize {
    if count <= 0 {
        if count < 0 {
            log::warn!("splat count {count} is negative, using an empty field");
        }
        return 0;
    }
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    if count > MAX_SPLATS {
        log::warn!("splat count {count} exceeds {MAX_SPLATS}, clamping");
        return MAX_SPLATS;
    }
    count
}

fn clamp_to(name: &str, value: f32, range: RangeInclusive<f32>) -> f32 {
    let (min, max) = (*range.start(), *range.end());
    // NaN falls back to the lower bound
    let clamped = if value.is_nan() { min } else { value.clamp(min, max) };
    if clamped != value {
        log::warn!("{name} {value} outside {min}..={max}, using {clamped}");
    }
    clamped
}
