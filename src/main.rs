use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::executor::block_on;
use splatgen::{
    config::{clamp_count, Backend},
    data::SplatAttribute,
    gpu::{BufferDevice, GpuBuffer, HostDevice, WgpuDevice},
    Config, ExternalBuffers, SplatGenerator, SplatRenderer,
};
use std::time::Instant;

/// Stands in for the consuming renderer: keeps the latest binding and counts rebinds.
struct ProbeRenderer<H: GpuBuffer> {
    bound: Option<ExternalBuffers<H>>,
    binds: usize,
}

impl<H: GpuBuffer> SplatRenderer<H> for ProbeRenderer<H> {
    fn set_external_buffers(&mut self, buffers: &ExternalBuffers<H>) {
        self.binds += 1;
        log::info!(
            "renderer bound {} splats ({} / {} / {} / {} bytes)",
            buffers.count,
            buffers.position.size(),
            buffers.color.size(),
            buffers.covariance_0.size(),
            buffers.covariance_1.size()
        );
        self.bound = Some(buffers.clone());
    }

    fn release_external_buffers(&mut self) {
        log::info!("renderer released its buffers");
        self.bound = None;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    match config.backend {
        Backend::Host => run(HostDevice::new(), &config),
        Backend::Wgpu => {
            let device = block_on(WgpuDevice::request()).context("failed to acquire a GPU")?;
            run(device, &config)
        }
        Backend::Auto => match block_on(WgpuDevice::request()) {
            Ok(device) => run(device, &config),
            Err(error) => {
                log::warn!("{error}, falling back to host memory buffers");
                run(HostDevice::new(), &config)
            }
        },
    }
}

fn run<D: BufferDevice>(device: D, config: &Config) -> Result<()> {
    let renderer = ProbeRenderer {
        bound: None,
        binds: 0,
    };
    let mut generator = SplatGenerator::new(device, renderer, config.descriptor());
    generator.activate(0.).context("failed to activate the splat field")?;

    let frame_delta = 1. / config.frame_rate;
    let start = Instant::now();
    for frame in 0..config.frames {
        if config.resize_at == Some(frame) {
            if let Some(count) = config.resize_to {
                generator.descriptor_mut().count = clamp_count(count);
            }
        }

        let time = frame as f32 * frame_delta;
        if let Err(error) = generator.tick(time) {
            log::error!("tick {frame} failed: {error}");
            generator.deactivate();
            return Err(error).context("splat field deactivated after a failed tick");
        }

        if config.verify {
            verify(&generator, time).with_context(|| format!("frame {frame} did not verify"))?;
        }
    }

    let elapsed = start.elapsed();
    log::info!(
        "published {} frames in {:.2?} ({:.3} ms per frame), {} bind(s)",
        config.frames,
        elapsed,
        elapsed.as_secs_f64() * 1000. / config.frames.max(1) as f64,
        generator.renderer().binds
    );

    generator.deactivate();
    Ok(())
}

/// Reads every bound buffer back and compares it byte for byte with a recomputed frame.
fn verify<D: BufferDevice>(
    generator: &SplatGenerator<D, ProbeRenderer<D::Buffer>>,
    time: f32,
) -> Result<()> {
    let Some(quartet) = generator.publisher().quartet() else {
        return Ok(());
    };
    let bound_count = generator.renderer().bound.as_ref().map(|buffers| buffers.count);
    if bound_count != Some(quartet.count()) {
        bail!(
            "renderer holds {bound_count:?} splats but {} are published",
            quartet.count()
        );
    }

    let frame = generator.frame_at(time);
    let expected: [(SplatAttribute, &[u8]); 4] = [
        (SplatAttribute::Position, bytemuck::cast_slice(&frame.positions)),
        (SplatAttribute::Color, bytemuck::cast_slice(&frame.colors)),
        (SplatAttribute::CovariancePart0, bytemuck::cast_slice(&frame.covariance_0)),
        (SplatAttribute::CovariancePart1, bytemuck::cast_slice(&frame.covariance_1)),
    ];

    let device = generator.publisher().device();
    for (attribute, bytes) in expected {
        let contents = device.read_buffer(quartet.buffer(attribute))?;
        if contents != bytes {
            bail!("{} does not match the computed frame", attribute.label());
        }
    }
    Ok(())
}
