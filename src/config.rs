// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Defaults and limits.

use std::time::Duration;

/// Left edge of the default world.
pub const WORLD_X: f64 = -1.77;
/// Top edge of the default world.
pub const WORLD_Y: f64 = -1.0;
/// Width of the default world; 16:9 with `WORLD_HEIGHT`.
pub const WORLD_WIDTH: f64 = 3.54;
/// Height of the default world.
pub const WORLD_HEIGHT: f64 = 2.0;

/// Widest image we will render.
pub const MAX_WIDTH: usize = 1920;
/// Tallest image we will render.
pub const MAX_HEIGHT: usize = 1080;
/// Most samples we will plot in one render.
pub const MAX_SAMPLES: usize = 10_000_000;
/// Most worker threads in either stage.
pub const MAX_THREADS: usize = 12;

/// Steps each walk takes before it starts plotting.
pub const WARMUP_ITERATIONS: usize = 50;
/// Display gamma for tone mapping.
pub const GAMMA: f64 = 2.2;
/// How long a stage may run before it is abandoned.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Where the image goes when nobody says otherwise.
pub const DEFAULT_OUTPUT: &str = "FractalFlame.png";
