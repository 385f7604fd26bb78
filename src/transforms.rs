// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Transformations are the functions of the iterated function system.
//! The renderer only knows them through the `Transformation` trait:
//! a pure map from a point to a point, with no state of its own.  Any
//! closure of the right shape is a transformation, and `Variation`
//! names the classic flame variations so the command line can pick
//! them by name.

use crate::planes::Point;
use rand::Rng;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// One function of the iterated function system.
pub trait Transformation: Send + Sync {
    /// Map a point to its successor on the walk.  Must be
    /// deterministic.  May return a non-finite point; the renderer
    /// deals with that.
    fn apply(&self, p: Point) -> Point;
}

impl<F> Transformation for F
where
    F: Fn(Point) -> Point + Send + Sync,
{
    fn apply(&self, p: Point) -> Point {
        self(p)
    }
}

/// Picks which transformation takes the next step.  Every member of
/// the set is equally likely.
#[derive(Debug, Clone, Copy)]
pub struct Chooser {
    len: usize,
}

impl Chooser {
    /// A chooser over a set of `len` transformations; `len` is at
    /// least one.
    pub fn uniform(len: usize) -> Self {
        debug_assert!(len > 0);
        Chooser { len }
    }

    /// The index of the next transformation.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> usize {
        rng.gen_range(0, self.len)
    }
}

/// The catalog of named variations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Variation {
    /// The identity.
    Linear,
    /// `(sin x, sin y)`
    Sinusoidal,
    /// Inversion through the unit circle.
    Spherical,
    /// Rotation by an angle that grows with the radius.
    Swirl,
    /// Folds the plane along the diagonals.
    Horseshoe,
    /// Maps angle and radius onto x and y.
    Polar,
    /// Polar coordinates mixed by sine and cosine.
    Handkerchief,
    /// Cardioid.
    Heart,
    /// Folds the plane into a disk.
    Disk,
    /// `e^(x-1)` scaled around the angle of y.
    Exponential,
}

const NAMES: &[(&str, Variation)] = &[
    ("linear", Variation::Linear),
    ("sinusoidal", Variation::Sinusoidal),
    ("spherical", Variation::Spherical),
    ("swirl", Variation::Swirl),
    ("horseshoe", Variation::Horseshoe),
    ("polar", Variation::Polar),
    ("handkerchief", Variation::Handkerchief),
    ("heart", Variation::Heart),
    ("disk", Variation::Disk),
    ("exponential", Variation::Exponential),
];

impl Variation {
    /// Names accepted by `from_str`, in catalog order.
    pub fn names() -> Vec<&'static str> {
        NAMES.iter().map(|(name, _)| *name).collect()
    }

    /// The variation's name in the catalog.
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, v)| *v == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for Variation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, v)| *v)
            .ok_or_else(|| format!("unknown variation '{}'", s))
    }
}

impl Transformation for Variation {
    fn apply(&self, p: Point) -> Point {
        let Point { x, y } = p;
        let r2 = x * x + y * y;
        let r = r2.sqrt();
        let theta = y.atan2(x);
        match *self {
            Variation::Linear => p,
            Variation::Sinusoidal => Point::new(x.sin(), y.sin()),
            Variation::Spherical => Point::new(x / r2, y / r2),
            Variation::Swirl => Point::new(
                x * r2.sin() - y * r2.cos(),
                x * r2.cos() + y * r2.sin(),
            ),
            Variation::Horseshoe => Point::new((x - y) * (x + y) / r, 2.0 * x * y / r),
            Variation::Polar => Point::new(theta / PI, r - 1.0),
            Variation::Handkerchief => {
                Point::new(r * (theta + r).sin(), r * (theta - r).cos())
            }
            Variation::Heart => Point::new(r * (theta * r).sin(), -r * (theta * r).cos()),
            Variation::Disk => {
                let scale = theta / PI;
                Point::new(scale * (PI * r).sin(), scale * (PI * r).cos())
            }
            Variation::Exponential => {
                let scale = (x - 1.0).exp();
                Point::new(scale * (PI * y).cos(), scale * (PI * y).sin())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12
    }

    #[test]
    fn closures_are_transformations() {
        let halve = |p: Point| Point::new(p.x / 2.0, p.y / 2.0);
        assert_eq!(halve.apply(Point::new(2.0, 4.0)), Point::new(1.0, 2.0));
        let boxed: Box<dyn Transformation> = Box::new(halve);
        assert_eq!(boxed.apply(Point::new(2.0, 4.0)), Point::new(1.0, 2.0));
    }

    #[test]
    fn every_name_round_trips() {
        for name in Variation::names() {
            let v: Variation = name.parse().unwrap();
            assert_eq!(v.name(), name);
        }
        assert_eq!("Heart".parse::<Variation>(), Ok(Variation::Heart));
        assert!("julia".parse::<Variation>().is_err());
    }

    #[test]
    fn heart_matches_its_formula() {
        let p = Point::new(0.0, 1.0);
        // r = 1, theta = pi/2
        let expected = Point::new((PI / 2.0).sin(), -(PI / 2.0).cos());
        assert!(close(Variation::Heart.apply(p), expected));
    }

    #[test]
    fn spherical_inverts_through_the_unit_circle() {
        assert!(close(
            Variation::Spherical.apply(Point::new(2.0, 0.0)),
            Point::new(0.5, 0.0)
        ));
    }

    #[test]
    fn variations_are_deterministic() {
        let p = Point::new(0.3, -0.7);
        for name in Variation::names() {
            let v: Variation = name.parse().unwrap();
            assert_eq!(v.apply(p), v.apply(p));
        }
    }

    #[test]
    fn spherical_at_the_origin_is_not_finite() {
        assert!(!Variation::Spherical.apply(Point::new(0.0, 0.0)).is_finite());
    }

    #[test]
    fn chooser_stays_in_range_and_reaches_every_index() {
        let chooser = Chooser::uniform(3);
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [0usize; 3];
        for _ in 0..3000 {
            seen[chooser.choose(&mut rng)] += 1;
        }
        assert!(seen.iter().all(|&n| n > 800));
    }
}
