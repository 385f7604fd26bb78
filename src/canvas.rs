// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The density canvas: one hit counter per pixel, plus the brightness
//! the tone mapper derives from it.
//!
//! Rendering threads share the canvas by reference and bump counters
//! atomically, so walks that land on the same pixel at the same time
//! never lose a hit.  Tone mapping instead takes the canvas mutably
//! and cuts it into disjoint row `Band`s, one per thread, so the
//! brightness plane needs no locking at all.

use crate::errors::RenderError;
use crate::planes::Pixel;
use num::clamp;
use std::mem;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// A `width` by `height` histogram of hit counts.
#[derive(Debug)]
pub struct DensityCanvas {
    width: usize,
    height: usize,
    hits: Vec<AtomicU64>,
    brightness: Vec<f64>,
}

impl DensityCanvas {
    /// A zeroed canvas.  Both dimensions must be strictly positive.
    pub fn new(width: usize, height: usize) -> Result<DensityCanvas, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions(format!(
                "canvas {}x{} must have positive width and height",
                width, height
            )));
        }
        let len = width.checked_mul(height).ok_or_else(|| {
            RenderError::InvalidDimensions(format!("canvas {}x{} is too large", width, height))
        })?;
        Ok(DensityCanvas {
            width,
            height,
            hits: (0..len).map(|_| AtomicU64::new(0)).collect(),
            brightness: vec![0.0; len],
        })
    }

    /// Columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The total number of cells.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Never true; a canvas always has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    fn offset(&self, pixel: Pixel) -> Option<usize> {
        if pixel.0 < self.width && pixel.1 < self.height {
            Some(pixel.1 * self.width + pixel.0)
        } else {
            None
        }
    }

    /// Record one hit.  Safe to call from many threads at once.
    /// Returns false, and records nothing, for a pixel off the canvas.
    pub fn increment(&self, pixel: Pixel) -> bool {
        self.add(pixel, 1)
    }

    /// Record `n` hits at once.
    pub fn add(&self, pixel: Pixel, n: u64) -> bool {
        match self.offset(pixel) {
            Some(offset) => {
                self.hits[offset].fetch_add(n, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// The hit count at a pixel; zero off the canvas.
    pub fn hits(&self, pixel: Pixel) -> u64 {
        self.offset(pixel)
            .map(|offset| self.hits[offset].load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// The sum of every counter.
    pub fn total_hits(&self) -> u64 {
        self.hits
            .iter()
            .map(|h| h.load(Ordering::Relaxed))
            .sum()
    }

    /// The tone-mapped brightness at a pixel, in `[0, 1]`; zero off the
    /// canvas.
    pub fn brightness(&self, pixel: Pixel) -> f64 {
        self.offset(pixel)
            .map(|offset| self.brightness[offset])
            .unwrap_or(0.0)
    }

    /// Cut the canvas into row bands, one per range.  The ranges must
    /// be contiguous, start at row 0 and end at the last row, which is
    /// what `partition(height, n)` produces.
    pub fn bands(&mut self, rows: &[Range<usize>]) -> Vec<Band<'_>> {
        assert_eq!(rows.first().map(|r| r.start), Some(0));
        assert_eq!(rows.last().map(|r| r.end), Some(self.height));
        let width = self.width;
        let mut hits: &[AtomicU64] = &self.hits;
        let mut brightness: &mut [f64] = &mut self.brightness;
        let mut bands = Vec::with_capacity(rows.len());
        for range in rows {
            let cells = range.len() * width;
            let (band_hits, rest_hits) = hits.split_at(cells);
            let (band_brightness, rest_brightness) =
                mem::take(&mut brightness).split_at_mut(cells);
            hits = rest_hits;
            brightness = rest_brightness;
            bands.push(Band {
                rows: range.clone(),
                hits: band_hits,
                brightness: band_brightness,
            });
        }
        bands
    }

    /// The brightness plane as 8-bit grayscale, row-major, ready for
    /// an image encoder.
    pub fn to_luma8(&self) -> Vec<u8> {
        self.brightness
            .iter()
            .map(|b| (clamp(*b, 0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}

/// A run of whole rows of the canvas, handed to exactly one tone
/// mapping worker.
#[derive(Debug)]
pub struct Band<'a> {
    rows: Range<usize>,
    hits: &'a [AtomicU64],
    brightness: &'a mut [f64],
}

impl<'a> Band<'a> {
    /// The canvas rows this band covers.
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// Hit counts of every cell in the band, row-major.
    pub fn hits<'b>(&'b self) -> impl Iterator<Item = u64> + 'b {
        self.hits.iter().map(|h| h.load(Ordering::Relaxed))
    }

    /// Brightness of every cell in the band, row-major.
    pub fn brightness(&self) -> &[f64] {
        &self.brightness[..]
    }

    /// Hit counts paired with writable brightness, for stages that
    /// derive brightness from the histogram.
    pub fn cells_mut<'b>(&'b mut self) -> impl Iterator<Item = (u64, &'b mut f64)> + 'b {
        self.hits
            .iter()
            .map(|h| h.load(Ordering::Relaxed))
            .zip(self.brightness.iter_mut())
    }

    /// Writable brightness, for stages that rework the previous stage's
    /// output.
    pub fn brightness_mut(&mut self) -> &mut [f64] {
        &mut self.brightness[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    #[test]
    fn rejects_empty_dimensions() {
        assert!(DensityCanvas::new(0, 10).is_err());
        assert!(DensityCanvas::new(10, 0).is_err());
    }

    #[test]
    fn rejects_dimensions_whose_area_overflows() {
        match DensityCanvas::new(usize::max_value(), 2) {
            Err(RenderError::InvalidDimensions(_)) => {}
            other => panic!("unexpected: {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn counters_do_not_wrap_past_u32() {
        let canvas = DensityCanvas::new(2, 1).unwrap();
        let busy = u64::from(u32::max_value());
        assert!(canvas.add(Pixel(0, 0), busy));
        assert!(canvas.increment(Pixel(0, 0)));
        assert!(canvas.increment(Pixel(1, 0)));
        assert_eq!(canvas.hits(Pixel(0, 0)), busy + 1);
        assert_eq!(canvas.total_hits(), busy + 2);
    }

    #[test]
    fn starts_at_zero() {
        let canvas = DensityCanvas::new(3, 2).unwrap();
        assert_eq!(canvas.len(), 6);
        assert_eq!(canvas.total_hits(), 0);
        assert_eq!(canvas.to_luma8(), vec![0; 6]);
    }

    #[test]
    fn increments_are_bounds_checked() {
        let canvas = DensityCanvas::new(3, 2).unwrap();
        assert!(canvas.increment(Pixel(2, 1)));
        assert!(!canvas.increment(Pixel(3, 0)));
        assert!(!canvas.increment(Pixel(0, 2)));
        assert_eq!(canvas.hits(Pixel(2, 1)), 1);
        assert_eq!(canvas.total_hits(), 1);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let canvas = DensityCanvas::new(2, 2).unwrap();
        crossbeam::scope(|spawner| {
            for _ in 0..8 {
                let canvas = &canvas;
                spawner.spawn(move |_| {
                    for _ in 0..10_000 {
                        canvas.increment(Pixel(1, 1));
                    }
                });
            }
        })
        .unwrap();
        assert_eq!(canvas.hits(Pixel(1, 1)), 80_000);
    }

    #[test]
    fn bands_cover_every_row_once() {
        let mut canvas = DensityCanvas::new(4, 7).unwrap();
        canvas.add(Pixel(0, 6), 5);
        let rows = partition(7, 3);
        let bands = canvas.bands(&rows);
        assert_eq!(
            bands.iter().map(|b| b.rows()).collect::<Vec<_>>(),
            vec![0..2, 2..4, 4..7]
        );
        assert_eq!(bands.iter().map(|b| b.brightness().len()).sum::<usize>(), 28);
        assert_eq!(bands[2].hits().nth(8), Some(5));
    }

    #[test]
    fn band_writes_land_in_the_canvas() {
        let mut canvas = DensityCanvas::new(2, 2).unwrap();
        {
            let rows = partition(2, 2);
            let mut bands = canvas.bands(&rows);
            bands[1].brightness_mut()[1] = 1.0;
        }
        assert_eq!(canvas.brightness(Pixel(1, 1)), 1.0);
        assert_eq!(canvas.to_luma8(), vec![0, 0, 0, 255]);
    }
}
