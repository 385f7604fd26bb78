// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The chaos game.
//!
//! A walk starts at a random point in the world and, at every step,
//! moves to the image of its current point under a randomly chosen
//! transformation.  The first steps are thrown away while the walk
//! falls onto the attractor; after that, every step lands on a pixel
//! of the canvas (or off the edge of it) and the pixel's counter goes
//! up by one.
//!
//! Several walks run at once, one per thread, sharing the canvas.  The
//! requested number of samples is split between them exactly, with the
//! remainder going to the last walk, and each walk has its own random
//! number generator with its own seed.

use crate::canvas::DensityCanvas;
use crate::config::MAX_TIMEOUT;
use crate::errors::RenderError;
use crate::partition::budgets;
use crate::planes::{PlaneMapper, Point, WorldRect};
use crate::pool::{self, PoolError};
use crate::transforms::{Chooser, Transformation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

// How many steps a walk takes between looks at the cancel flag.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Where each walk's seed comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeedSource {
    /// The clock, mixed with the walk's index.  Different every run.
    Time,
    /// A fixed base seed, mixed with the walk's index.  Reproducible
    /// for a given thread count.
    Fixed(u64),
}

impl SeedSource {
    /// The seed for the walk with this index.
    pub fn seed_for(&self, index: usize) -> u64 {
        let base = match *self {
            SeedSource::Time => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
            SeedSource::Fixed(base) => base,
        };
        mix(base ^ mix(index as u64 + 1))
    }
}

// The splitmix64 finalizer: nearby inputs give unrelated outputs.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Knobs for a threaded render that don't change the picture.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Seeds for the walks.
    pub seeds: SeedSource,
    /// How long the walks may take, all together.
    pub timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            seeds: SeedSource::Time,
            timeout: MAX_TIMEOUT,
        }
    }
}

/// Where the samples of a render went.  On a completed render the
/// three add up to the number of samples requested.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RenderStats {
    /// Samples that landed on the canvas and were counted.
    pub plotted: u64,
    /// Samples that landed outside the canvas.
    pub out_of_bounds: u64,
    /// Samples lost to a non-finite step, including the steps the walk
    /// spent settling back onto the attractor afterwards.
    pub diverged: u64,
}

impl RenderStats {
    /// Every sample accounted for.
    pub fn samples(&self) -> u64 {
        self.plotted + self.out_of_bounds + self.diverged
    }
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: RenderStats) {
        self.plotted += other.plotted;
        self.out_of_bounds += other.out_of_bounds;
        self.diverged += other.diverged;
    }
}

/// Holds what every walk of one render shares: the mapping from the
/// world onto the canvas and the number of warm-up steps.
#[derive(Debug, Clone)]
pub struct ChaosRenderer {
    plane: PlaneMapper,
    warmup: usize,
}

impl ChaosRenderer {
    /// A renderer onto a `width` by `height` canvas viewing `world`.
    pub fn new(
        width: usize,
        height: usize,
        world: WorldRect,
        warmup: usize,
    ) -> Result<Self, RenderError> {
        let plane = PlaneMapper::new(width, height, world)?;
        Ok(ChaosRenderer { plane, warmup })
    }

    fn random_point<R: Rng>(&self, rng: &mut R) -> Point {
        let world = &self.plane.world;
        let origin = world.origin();
        Point::new(
            rng.gen_range(origin.x, origin.x + world.width()),
            rng.gen_range(origin.y, origin.y + world.height()),
        )
    }

    /// One walk of `budget` plotted steps.  The first `warmup` steps
    /// are free.  A step that goes non-finite costs one sample, and
    /// restarts the walk at a fresh random point; the `warmup` steps
    /// after a restart are paid for but not plotted.  Stops early,
    /// without error, if `cancel` is set.
    pub fn walk(
        &self,
        canvas: &DensityCanvas,
        transformations: &[Box<dyn Transformation>],
        budget: usize,
        seed: u64,
        cancel: &AtomicBool,
    ) -> RenderStats {
        let mut rng = StdRng::seed_from_u64(seed);
        let chooser = Chooser::uniform(transformations.len());
        let mut stats = RenderStats::default();
        let mut point = self.random_point(&mut rng);
        let mut warming = self.warmup;
        let mut settling = 0;
        let mut remaining = budget;
        let mut steps: u64 = 0;

        while remaining > 0 {
            if steps % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                break;
            }
            steps += 1;

            let next = transformations[chooser.choose(&mut rng)].apply(point);
            if !next.is_finite() {
                point = self.random_point(&mut rng);
                if warming > 0 {
                    warming -= 1;
                } else {
                    remaining -= 1;
                    stats.diverged += 1;
                    settling = self.warmup;
                }
                continue;
            }
            point = next;

            if warming > 0 {
                warming -= 1;
                continue;
            }
            remaining -= 1;
            if settling > 0 {
                settling -= 1;
                stats.diverged += 1;
                continue;
            }
            match self.plane.point_to_pixel(&point) {
                Some(pixel) => {
                    canvas.increment(pixel);
                    stats.plotted += 1;
                }
                None => stats.out_of_bounds += 1,
            }
        }
        stats
    }

    /// Split `samples` between `threads` walks and run them all into
    /// `canvas`.  Blocks until every walk is done, or fails once
    /// `options.timeout` has passed.
    pub fn render(
        &self,
        canvas: &DensityCanvas,
        transformations: &[Box<dyn Transformation>],
        samples: usize,
        threads: usize,
        options: &RenderOptions,
    ) -> Result<RenderStats, RenderError> {
        if samples == 0 {
            return Err(RenderError::InvalidDimensions(
                "sample count must be positive".to_string(),
            ));
        }
        if transformations.is_empty() {
            return Err(RenderError::EmptyTransformationSet);
        }
        if threads == 0 {
            return Err(RenderError::InvalidThreadCount(threads));
        }
        if canvas.width() != self.plane.width || canvas.height() != self.plane.height {
            return Err(RenderError::InvalidDimensions(format!(
                "canvas is {}x{} but the renderer maps onto {}x{}",
                canvas.width(),
                canvas.height(),
                self.plane.width,
                self.plane.height
            )));
        }

        let budgets = budgets(samples, threads);
        info!(samples, threads, warmup = self.warmup, "rendering");
        let cancel = AtomicBool::new(false);
        let outcome = pool::run(
            budgets,
            options.timeout,
            || cancel.store(true, Ordering::Relaxed),
            |index, budget| {
                let stats = self.walk(
                    canvas,
                    transformations,
                    budget,
                    options.seeds.seed_for(index),
                    &cancel,
                );
                debug!(
                    worker = index,
                    budget,
                    plotted = stats.plotted,
                    out_of_bounds = stats.out_of_bounds,
                    diverged = stats.diverged,
                    "walk finished"
                );
                stats
            },
        );

        match outcome {
            Ok(all) => {
                let mut total = RenderStats::default();
                for stats in all {
                    total += stats;
                }
                Ok(total)
            }
            Err(PoolError::TimedOut) => {
                warn!(timeout = ?options.timeout, "render workers timed out");
                Err(RenderError::WorkerTimeout(options.timeout))
            }
            Err(PoolError::Panicked(index)) => Err(RenderError::WorkerPanicked(index)),
        }
    }
}

/// Render `total_samples` samples of the flame defined by
/// `transformations` into `canvas`, using `threads` walks.  The canvas
/// views `world`.
pub fn render(
    canvas: &DensityCanvas,
    world: WorldRect,
    transformations: &[Box<dyn Transformation>],
    total_samples: usize,
    warmup: usize,
    threads: usize,
    options: &RenderOptions,
) -> Result<RenderStats, RenderError> {
    ChaosRenderer::new(canvas.width(), canvas.height(), world, warmup)?.render(
        canvas,
        transformations,
        total_samples,
        threads,
        options,
    )
}
