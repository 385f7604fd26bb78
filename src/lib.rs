#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fractal flame renderer
//!
//! A fractal flame is the attractor of an iterated function system: a
//! handful of nonlinear functions of the plane.  Start a point
//! anywhere, repeatedly replace it with its image under one of the
//! functions chosen at random (the "chaos game"), and after a few
//! steps the point is wandering over the attractor.  Counting how
//! often it lands on each pixel gives a density histogram, and the
//! picture is that histogram seen through a logarithm, since the
//! busiest pixels are hit many orders of magnitude more often than the
//! quietest.
//!
//! Rendering runs several walks at once on a shared canvas of atomic
//! counters.  Tone mapping then cuts the canvas into bands of rows, one
//! per thread; every thread finds the busiest pixel in its band, the
//! threads meet at a barrier to agree on the busiest pixel overall, and
//! only then does each thread rescale its band.
//!
//! ```no_run
//! use flame::{render_flame, FlameConfig, Transformation, Variation};
//!
//! let transformations: Vec<Box<dyn Transformation>> =
//!     vec![Box::new(Variation::Heart), Box::new(Variation::Swirl)];
//! let (canvas, _stats) = render_flame(&FlameConfig::default(), &transformations).unwrap();
//! let pixels = canvas.to_luma8();
//! assert_eq!(pixels.len(), canvas.width() * canvas.height());
//! ```

pub mod canvas;
pub mod config;
pub mod errors;
pub mod partition;
pub mod pipeline;
pub mod planes;
mod pool;
pub mod renderer;
pub mod rendezvous;
pub mod tonemap;
pub mod transforms;

pub use canvas::DensityCanvas;
pub use errors::{FlameError, ProcessingError, RenderError};
pub use pipeline::{render_flame, FlameConfig};
pub use planes::{Pixel, Point, WorldRect};
pub use renderer::{render, RenderOptions, RenderStats, SeedSource};
pub use tonemap::{apply_tone_mapping, GammaLogCorrection, NoiseFloor, Stage, Timeouts};
pub use transforms::{Transformation, Variation};
