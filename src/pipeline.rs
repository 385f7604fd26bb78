// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The whole render, start to finish: build the canvas, run the walks,
//! wait for all of them, tone map, wait again, and hand back a canvas
//! that is ready to encode.  Either both stages finish or the caller
//! gets an error saying which one did not; there is no half-finished
//! canvas to write out by mistake.

use crate::canvas::DensityCanvas;
use crate::config::{GAMMA, MAX_THREADS, MAX_TIMEOUT, WARMUP_ITERATIONS};
use crate::errors::{FlameError, RenderError};
use crate::planes::WorldRect;
use crate::renderer::{render, RenderOptions, RenderStats, SeedSource};
use crate::tonemap::{apply_tone_mapping, GammaLogCorrection, NoiseFloor, Stage, Timeouts};
use crate::transforms::Transformation;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Everything about a render except the transformations.
#[derive(Debug, Clone)]
pub struct FlameConfig {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Samples to plot, across all walks.
    pub samples: usize,
    /// Unplotted steps at the start of each walk.
    pub warmup: usize,
    /// Worker threads for each stage; capped at `MAX_THREADS`.
    pub threads: usize,
    /// The part of the plane the image shows.
    pub world: WorldRect,
    /// Display gamma.
    pub gamma: f64,
    /// If set, pixels dimmer than this fraction of the brightest are
    /// blacked out after gamma correction.
    pub noise_floor: Option<f64>,
    /// Where the walks get their seeds.
    pub seeds: SeedSource,
    /// Deadline for each stage, and for each wait at a rendezvous.
    pub timeout: Duration,
}

impl FlameConfig {
    /// The tone-mapping stages this configuration asks for, in order.
    pub fn stages(&self) -> Vec<Box<dyn Stage>> {
        let mut stages: Vec<Box<dyn Stage>> =
            vec![Box::new(GammaLogCorrection { gamma: self.gamma })];
        if let Some(fraction) = self.noise_floor {
            stages.push(Box::new(NoiseFloor { fraction }));
        }
        stages
    }
}

impl Default for FlameConfig {
    fn default() -> Self {
        FlameConfig {
            width: 800,
            height: 600,
            samples: 1_000_000,
            warmup: WARMUP_ITERATIONS,
            threads: num_cpus::get().min(MAX_THREADS),
            world: WorldRect::default(),
            gamma: GAMMA,
            noise_floor: None,
            seeds: SeedSource::Time,
            timeout: MAX_TIMEOUT,
        }
    }
}

/// Render and tone map a flame.  Returns the finished canvas and where
/// the samples went.
pub fn render_flame(
    config: &FlameConfig,
    transformations: &[Box<dyn Transformation>],
) -> Result<(DensityCanvas, RenderStats), FlameError> {
    if transformations.is_empty() {
        return Err(RenderError::EmptyTransformationSet.into());
    }
    let threads = if config.threads > MAX_THREADS {
        warn!(requested = config.threads, max = MAX_THREADS, "capping thread count");
        MAX_THREADS
    } else {
        config.threads
    };

    let mut canvas = DensityCanvas::new(config.width, config.height)?;
    let started = Instant::now();

    let options = RenderOptions {
        seeds: config.seeds,
        timeout: config.timeout,
    };
    let stats = render(
        &canvas,
        config.world,
        transformations,
        config.samples,
        config.warmup,
        threads,
        &options,
    )?;
    info!(
        plotted = stats.plotted,
        out_of_bounds = stats.out_of_bounds,
        diverged = stats.diverged,
        elapsed = ?started.elapsed(),
        "render stage finished"
    );

    let timeouts = Timeouts {
        barrier: config.timeout,
        pool: config.timeout,
    };
    apply_tone_mapping(&mut canvas, &config.stages(), threads, &timeouts)?;
    info!(elapsed = ?started.elapsed(), "flame finished");

    Ok((canvas, stats))
}
