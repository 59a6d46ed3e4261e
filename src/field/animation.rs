use clap::ValueEnum;
use glam::{Vec3, Vec4};

/// Offset added to a splat's distance from the centre before it divides the orbit rate.
const ORBIT_FALLOFF_OFFSET: f32 = 0.5;
/// Spatial frequency of the vertical wave along the distance from the centre.
const BOB_FREQUENCY: f32 = 3.;
const BOB_AMPLITUDE: f32 = 0.2;

/// How base positions move over time.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    /// base positions are published unchanged every frame
    Static,
    /// splats orbit the vertical axis, inner ones faster, while bobbing on an outward wave
    #[default]
    Orbit,
}

/// Maps a base position at `time` to its animated position and colour.
pub fn evaluate(base: Vec3, time: f32, speed: f32, radius: f32, motion: Motion) -> (Vec3, Vec4) {
    let position = match motion {
        Motion::Static => base,
        Motion::Orbit => orbit(base, time, speed),
    };
    (position, color(position, radius))
}

/// Rotates `base` about +Y by an angle that falls off with distance and adds a vertical bob.
pub fn orbit(base: Vec3, time: f32, speed: f32) -> Vec3 {
    let distance = base.length();
    let phase = time * speed;
    let angle = phase * (1. + 1. / (distance + ORBIT_FALLOFF_OFFSET));

    let (sin, cos) = angle.sin_cos();
    Vec3::new(
        base.x * cos - base.z * sin,
        base.y + (phase + distance * BOB_FREQUENCY).sin() * BOB_AMPLITUDE,
        base.x * sin + base.z * cos,
    )
}

/// Maps each axis of `position` from `[-radius, radius]` onto `[0, 1]`, alpha fixed at one.
pub fn color(position: Vec3, radius: f32) -> Vec4 {
    let rgb = if radius > 0. {
        (position / radius * 0.5 + 0.5).clamp(Vec3::ZERO, Vec3::ONE)
    } else {
        Vec3::splat(0.5)
    };
    rgb.extend(1.)
}
