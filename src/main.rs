use std::{process::ExitCode, time::Instant};

use clap::Parser;
use log::{debug, error, info, warn};
use mandelbrot_refine::{config::Config, stats::FrameStats, Renderer, RendererError};

fn main() -> ExitCode {
    env_logger::init();

    let config = Config::parse();
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), RendererError> {
    let renderer = Renderer::new(config.width, config.height)?;
    renderer.set_function(config.function);
    renderer.set_offset(config.offset)?;
    if let Some(zoom) = config.zoom {
        renderer.set_zoom(zoom)?;
    }
    renderer.set_palette(
        config.palette.anchors(),
        config.palette_size,
        config.set_colour,
    )?;
    renderer.set_channel_order(config.channel_order)?;

    let stride = config.width as usize * 4;
    let mut frame = vec![0u8; stride * config.height as usize];

    debug!("{:?}", config);

    let mut stats = FrameStats::new();
    for frame_number in 0..config.frames {
        let max_iterations = match renderer.iterate(config.iterations as u32) {
            Ok(max_iterations) => max_iterations,
            Err(RendererError::IterationCeilingReached { ceiling, .. }) => {
                warn!("stopping at the iteration ceiling of {}", ceiling);
                break;
            }
            Err(err) => return Err(err),
        };
        renderer.render(&mut frame, stride, config.mapping)?;
        let frame_time = stats.record(Instant::now());

        let histogram = renderer.histogram()?;
        info!(
            "frame {}: {} iterations, {} escaped, {} in set, {:?} ({:?} smoothed)",
            frame_number,
            max_iterations,
            histogram.total(),
            histogram.in_set(),
            frame_time,
            stats.smoothed()
        );

        if let Some(factor) = config.zoom_factor {
            renderer.scale_zoom(factor)?;
        }
    }

    info!(
        "{} frames, {:?} average frame time",
        stats.frames(),
        stats.average()
    );

    renderer.free();
    Ok(())
}
