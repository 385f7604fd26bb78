// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ways a render can fail.  Configuration errors are raised before
//! any worker starts; the rest come from coordinating the workers.

use failure::Fail;
use std::time::Duration;

/// Failures of canvas construction and of the rendering stage.
#[derive(Debug, Fail, PartialEq)]
pub enum RenderError {
    /// A width, height or sample count was not strictly positive, or
    /// the world rectangle was degenerate.
    #[fail(display = "invalid dimensions: {}", _0)]
    InvalidDimensions(String),

    /// Render requested with no transformations to choose from.
    #[fail(display = "no transformations were selected")]
    EmptyTransformationSet,

    /// Zero worker threads requested.
    #[fail(display = "invalid thread count: {}", _0)]
    InvalidThreadCount(usize),

    /// The render workers did not all finish before the deadline.
    #[fail(display = "render workers did not finish within {:?}", _0)]
    WorkerTimeout(Duration),

    /// A render worker died before finishing its walk.
    #[fail(display = "render worker {} panicked", _0)]
    WorkerPanicked(usize),
}

/// Failures of a tone-mapping stage.
#[derive(Debug, Fail, PartialEq)]
pub enum ProcessingError {
    /// Zero worker threads requested.
    #[fail(display = "invalid thread count: {}", _0)]
    InvalidThreadCount(usize),

    /// A participant timed out or failed at the rendezvous between the
    /// two phases; no worker ran the second phase.
    #[fail(display = "stage {} aborted: barrier broken", stage)]
    BarrierBroken {
        /// Name of the failed stage.
        stage: &'static str,
    },

    /// The stage's workers did not all finish before the deadline.
    #[fail(display = "stage {} did not finish within {:?}", stage, timeout)]
    WorkerTimeout {
        /// Name of the failed stage.
        stage: &'static str,
        /// The deadline that passed.
        timeout: Duration,
    },

    /// A stage worker died.
    #[fail(display = "stage {} worker {} panicked", stage, worker)]
    WorkerPanicked {
        /// Name of the failed stage.
        stage: &'static str,
        /// Index of the dead worker.
        worker: usize,
    },
}

/// A failed pipeline run, naming the stage that failed.
#[derive(Debug, Fail)]
pub enum FlameError {
    /// The rendering stage failed.
    #[fail(display = "render stage failed: {}", _0)]
    Render(#[cause] RenderError),

    /// The tone-mapping stage failed.
    #[fail(display = "tone mapping failed: {}", _0)]
    Processing(#[cause] ProcessingError),
}

impl From<RenderError> for FlameError {
    fn from(e: RenderError) -> Self {
        FlameError::Render(e)
    }
}

impl From<ProcessingError> for FlameError {
    fn from(e: ProcessingError) -> Self {
        FlameError::Processing(e)
    }
}
