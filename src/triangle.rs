//! Triangle vertex derivation: explicit points, equilateral, isosceles.

use std::f64::consts::PI;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{CanvasError, Result};
use crate::geometry::{Bounds, Point};
use crate::units::{Length, UnitConverter};

/// A point whose coordinates are still declared lengths.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PointSpec {
    pub x: Length,
    pub y: Length,
}

impl PointSpec {
    pub fn new(x: impl Into<Length>, y: impl Into<Length>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    fn resolve(&self, units: &mut UnitConverter) -> Result<Point> {
        Ok(Point::new(units.to_px(&self.x)?, units.to_px(&self.y)?))
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "TriangleRepr")]
pub enum TrianglePointSpec {
    Points([PointSpec; 3]),
    /// Vertices on a circle of radius `size` around `center`, the first at
    /// angle `rotation` (radians).
    Equilateral {
        center: PointSpec,
        size: Length,
        rotation: f64,
    },
    /// `direction` is one of `up`, `down`, `left`, `right`; validated when
    /// the vertices are computed.
    Isosceles {
        center: PointSpec,
        base: Length,
        height: Length,
        direction: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TriangleRepr {
    Points([PointSpec; 3]),
    Shaped(ShapedRepr),
}

#[derive(Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
enum ShapedRepr {
    Equilateral {
        center: PointSpec,
        size: Length,
        #[serde(default)]
        rotation: f64,
    },
    Isosceles {
        center: PointSpec,
        base: Length,
        height: Length,
        #[serde(default)]
        direction: Option<String>,
    },
}

impl From<TriangleRepr> for TrianglePointSpec {
    fn from(repr: TriangleRepr) -> Self {
        match repr {
            TriangleRepr::Points(points) => TrianglePointSpec::Points(points),
            TriangleRepr::Shaped(ShapedRepr::Equilateral {
                center,
                size,
                rotation,
            }) => TrianglePointSpec::Equilateral {
                center,
                size,
                rotation,
            },
            TriangleRepr::Shaped(ShapedRepr::Isosceles {
                center,
                base,
                height,
                direction,
            }) => TrianglePointSpec::Isosceles {
                center,
                base,
                height,
                direction: direction.unwrap_or_else(|| "up".to_string()),
            },
        }
    }
}

/// Which way the apex of an isosceles triangle points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for Direction {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(CanvasError::InvalidDirection(other.to_string())),
        }
    }
}

pub fn vertices(spec: &TrianglePointSpec, units: &mut UnitConverter) -> Result<[Point; 3]> {
    match spec {
        TrianglePointSpec::Points([a, b, c]) => {
            Ok([a.resolve(units)?, b.resolve(units)?, c.resolve(units)?])
        }
        TrianglePointSpec::Equilateral {
            center,
            size,
            rotation,
        } => {
            let center = center.resolve(units)?;
            let size = units.to_px(size)?;
            Ok(equilateral(center, size, *rotation))
        }
        TrianglePointSpec::Isosceles {
            center,
            base,
            height,
            direction,
        } => {
            let direction = direction.parse::<Direction>()?;
            let center = center.resolve(units)?;
            let base = units.to_px(base)?;
            let height = units.to_px(height)?;
            Ok(isosceles(center, base, height, direction))
        }
    }
}

/// `size` is the circumradius, so the rendered side is `size * sqrt(3)`.
pub fn equilateral(center: Point, size: f64, rotation: f64) -> [Point; 3] {
    [0.0, 1.0, 2.0].map(|k| {
        let angle = rotation + k * (2.0 * PI / 3.0);
        Point::new(center.x + size * angle.cos(), center.y + size * angle.sin())
    })
}

/// Apex first, then the two base corners.
pub fn isosceles(center: Point, base: f64, height: f64, direction: Direction) -> [Point; 3] {
    let (hb, hh) = (base / 2.0, height / 2.0);
    let Point { x, y } = center;
    match direction {
        Direction::Up => [
            Point::new(x, y - hh),
            Point::new(x - hb, y + hh),
            Point::new(x + hb, y + hh),
        ],
        Direction::Down => [
            Point::new(x, y + hh),
            Point::new(x - hb, y - hh),
            Point::new(x + hb, y - hh),
        ],
        Direction::Left => [
            Point::new(x - hh, y),
            Point::new(x + hh, y - hb),
            Point::new(x + hh, y + hb),
        ],
        Direction::Right => [
            Point::new(x + hh, y),
            Point::new(x - hh, y - hb),
            Point::new(x - hh, y + hb),
        ],
    }
}

pub fn bounds(points: &[Point; 3]) -> Bounds {
    Bounds::enclosing(points)
}
