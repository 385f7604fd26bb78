// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a rectangle in world space with an arbitrary origin and
//! extent.  Pixels are half-open: a pixel covers `[col, col + 1)` by
//! `[row, row + 1)`, so the far edge of the world belongs to no pixel.

use crate::config::{WORLD_HEIGHT, WORLD_WIDTH, WORLD_X, WORLD_Y};
use crate::errors::RenderError;

/// A location in world space.  Transformations consume and produce
/// these.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point {
    /// Horizontal world coordinate.
    pub x: f64,
    /// Vertical world coordinate.
    pub y: f64,
}

impl Point {
    /// Constructor.
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// A point is only plottable if both of its coordinates are.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Describes the column, row of a pixel on the canvas.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// The viewport onto world space: an origin (the corner that maps to
/// pixel 0,0) and a strictly positive width and height.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorldRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl WorldRect {
    /// Fails if either extent is not strictly positive, if any part of
    /// the rectangle is not a finite number, or if an extent is too
    /// small to move the far edge off the origin at this magnitude.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<WorldRect, RenderError> {
        if !(x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite()) {
            return Err(RenderError::InvalidDimensions(format!(
                "world rectangle ({}, {}, {}, {}) is not finite",
                x, y, width, height
            )));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(RenderError::InvalidDimensions(format!(
                "world extent {}x{} must be positive",
                width, height
            )));
        }
        let (right, bottom) = (x + width, y + height);
        if !(right.is_finite() && bottom.is_finite() && right > x && bottom > y) {
            return Err(RenderError::InvalidDimensions(format!(
                "world rectangle ({}, {}, {}, {}) has no room to sample in",
                x, y, width, height
            )));
        }
        Ok(WorldRect {
            x,
            y,
            width,
            height,
        })
    }

    /// The corner of the world that maps to pixel 0,0.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Horizontal extent.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Vertical extent.
    pub fn height(&self) -> f64 {
        self.height
    }
}

impl Default for WorldRect {
    fn default() -> Self {
        WorldRect {
            x: WORLD_X,
            y: WORLD_Y,
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
        }
    }
}

/// Contains the definitions of two planes: an integral cartesian
/// plane, and a world rectangle.  Maps points from one to the other.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// Columns and rows of the integral plane.
    pub width: usize,
    /// Rows of the integral plane.
    pub height: usize,
    /// The world rectangle being viewed.
    pub world: WorldRect,
    // Pixels per world unit, horizontally and vertically.
    grid_factors: (f64, f64),
}

impl PlaneMapper {
    /// Takes the size of the integral plane and the world rectangle
    /// it views.
    pub fn new(width: usize, height: usize, world: WorldRect) -> Result<PlaneMapper, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions(format!(
                "canvas {}x{} must have positive width and height",
                width, height
            )));
        }
        let grid_factors = (
            (width as f64) / world.width,
            (height as f64) / world.height,
        );
        Ok(PlaneMapper {
            width,
            height,
            world,
            grid_factors,
        })
    }

    /// Given a point in world space, return the pixel it lands on, or
    /// None if it lands outside `[0, width) x [0, height)`.  Non-finite
    /// points are never inside.
    pub fn point_to_pixel(&self, point: &Point) -> Option<Pixel> {
        let left = ((point.x - self.world.x) * self.grid_factors.0).floor();
        let top = ((point.y - self.world.y) * self.grid_factors.1).floor();
        // NaN fails every comparison, so it falls through to None.
        if left >= 0.0 && left < self.width as f64 && top >= 0.0 && top < self.height as f64 {
            Some(Pixel(left as usize, top as usize))
        } else {
            None
        }
    }

    /// Given a pixel, return the world coordinate of its upper-left
    /// corner.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Point {
        Point::new(
            (pixel.0 as f64) / self.grid_factors.0 + self.world.x,
            (pixel.1 as f64) / self.grid_factors.1 + self.world.y,
        )
    }
}
