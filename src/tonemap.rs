// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tone mapping turns hit counts into brightness.
//!
//! Hit counts on a flame span many orders of magnitude, so brightness
//! follows the logarithm of the count, scaled so that the busiest pixel
//! on the whole canvas is fully white, and then gamma corrected.  The
//! scale depends on every pixel, so each stage runs in two phases:
//! every worker finds the maximum over its own rows, all of them meet
//! at a `Rendezvous` that hands back the maximum over the canvas, and
//! only then does any worker rewrite its rows.
//!
//! Stages are chained: each sees the brightness the previous one left
//! behind, and each has its own rendezvous.

use crate::canvas::{Band, DensityCanvas};
use crate::config::{GAMMA, MAX_TIMEOUT};
use crate::errors::ProcessingError;
use crate::partition::partition;
use crate::pool::{self, PoolError};
use crate::rendezvous::{Broken, Rendezvous};
use num::clamp;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One post-processing pass over the canvas.
pub trait Stage: Sync {
    /// Short name for logs and errors.
    fn name(&self) -> &'static str;

    /// Phase one: the largest value this band contributes to the
    /// stage's normalization.  Must not modify anything.
    fn local_max(&self, band: &Band) -> f64;

    /// Phase two: rewrite the band, given the largest value over the
    /// whole canvas.
    fn apply(&self, band: &mut Band, global_max: f64);
}

/// Log-density brightness with gamma correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaLogCorrection {
    /// Display gamma; brightness is raised to `1 / gamma`.
    pub gamma: f64,
}

impl Default for GammaLogCorrection {
    fn default() -> Self {
        GammaLogCorrection { gamma: GAMMA }
    }
}

impl GammaLogCorrection {
    /// Brightness for a count, given the canvas-wide maximum of
    /// `ln(1 + count)`.  Zero counts, and an empty canvas, are black.
    pub fn brightness(&self, count: u64, global_max: f64) -> f64 {
        if count == 0 || global_max <= 0.0 {
            return 0.0;
        }
        let normalized = (count as f64).ln_1p() / global_max;
        clamp(normalized.powf(1.0 / self.gamma), 0.0, 1.0)
    }
}

impl Stage for GammaLogCorrection {
    fn name(&self) -> &'static str {
        "gamma-log"
    }

    fn local_max(&self, band: &Band) -> f64 {
        band.hits()
            .map(|count| (count as f64).ln_1p())
            .fold(0.0, f64::max)
    }

    fn apply(&self, band: &mut Band, global_max: f64) {
        for (count, brightness) in band.cells_mut() {
            *brightness = self.brightness(count, global_max);
        }
    }
}

/// Blacks out faint pixels: anything dimmer than `fraction` of the
/// brightest pixel on the canvas goes to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseFloor {
    /// Cut-off as a fraction of the brightest pixel, in `[0, 1]`.
    pub fraction: f64,
}

impl Stage for NoiseFloor {
    fn name(&self) -> &'static str {
        "noise-floor"
    }

    fn local_max(&self, band: &Band) -> f64 {
        band.brightness().iter().cloned().fold(0.0, f64::max)
    }

    fn apply(&self, band: &mut Band, global_max: f64) {
        let floor = self.fraction * global_max;
        for brightness in band.brightness_mut() {
            if *brightness < floor {
                *brightness = 0.0;
            }
        }
    }
}

/// How long tone-mapping workers may take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    /// How long one worker waits at the rendezvous for the others.
    pub barrier: Duration,
    /// How long all the workers of one stage may take together.
    pub pool: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            barrier: MAX_TIMEOUT,
            pool: MAX_TIMEOUT,
        }
    }
}

/// Run one stage with one worker per band.  Returns the maximum every
/// worker agreed on.
fn run_stage(
    canvas: &mut DensityCanvas,
    stage: &dyn Stage,
    threads: usize,
    timeouts: &Timeouts,
) -> Result<f64, ProcessingError> {
    let name = stage.name();
    let rows = partition(canvas.height(), threads);
    let bands = canvas.bands(&rows);
    let barrier = Rendezvous::new(threads, timeouts.barrier);

    let outcome = pool::run(
        bands,
        timeouts.pool,
        || barrier.abort(),
        |index, mut band| -> Result<f64, Broken> {
            let local = stage.local_max(&band);
            let global = barrier.wait(local)?;
            stage.apply(&mut band, global);
            debug!(stage = name, worker = index, rows = ?band.rows(), "band done");
            Ok(global)
        },
    );

    let results = match outcome {
        Ok(results) => results,
        Err(PoolError::TimedOut) => {
            warn!(stage = name, timeout = ?timeouts.pool, "tone mapping workers timed out");
            return Err(ProcessingError::WorkerTimeout {
                stage: name,
                timeout: timeouts.pool,
            });
        }
        Err(PoolError::Panicked(worker)) => {
            return Err(ProcessingError::WorkerPanicked {
                stage: name,
                worker,
            })
        }
    };
    let mut global = 0.0;
    for result in results {
        match result {
            Ok(released) => global = released,
            Err(_) => {
                warn!(stage = name, "rendezvous broken");
                return Err(ProcessingError::BarrierBroken { stage: name });
            }
        }
    }
    debug!(stage = name, global_max = global, "stage finished");
    Ok(global)
}

/// Run every stage, in order, over the whole canvas with `threads`
/// workers each.  Stops at the first stage that fails.
pub fn apply_tone_mapping(
    canvas: &mut DensityCanvas,
    stages: &[Box<dyn Stage>],
    threads: usize,
    timeouts: &Timeouts,
) -> Result<(), ProcessingError> {
    if threads == 0 {
        return Err(ProcessingError::InvalidThreadCount(threads));
    }
    for stage in stages {
        info!(stage = stage.name(), threads, "tone mapping");
        run_stage(canvas, stage.as_ref(), threads, timeouts)?;
    }
    Ok(())
}
