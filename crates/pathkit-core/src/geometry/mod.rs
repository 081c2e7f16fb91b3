//! Planar geometry for drawn paths.
//!
//! Drawings are made of lines and arcs in millimetres. All shapes are
//! immutable values: reversing or transforming a shape returns a new one.

mod arc;
mod line;
mod support_bars;

pub use arc::Arc;
pub use line::Line;
pub use support_bars::{support_bar_pieces, BarSpec, Divisible, PieceRole, SupportBarPiece};

use crate::gcode::GCodeWriter;
use crate::transform::{Transformation2, Transformation3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two drawn positions closer than this are the same position.
pub const POSITION_TOLERANCE: f64 = 1e-3;

/// A point in the drawing plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Creates a new point with the given X and Y coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculates the distance to another point.
    pub fn distance_to(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// True when both points are within [`POSITION_TOLERANCE`] of each other.
    pub fn coincides(&self, other: &Point2) -> bool {
        self.distance_to(other) <= POSITION_TOLERANCE
    }

    /// Point at `t` along the way to `other` (0 = self, 1 = other).
    pub fn lerp(&self, other: &Point2, t: f64) -> Point2 {
        Point2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Vector from `self` to `other`.
    pub fn vector_to(&self, other: &Point2) -> Point2 {
        Point2::new(other.x - self.x, other.y - self.y)
    }

    /// Lifts the point to the given height.
    pub fn at_height(&self, z: f64) -> Point3 {
        Point3::new(self.x, self.y, z)
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// A tool head position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Projection onto the drawing plane.
    pub fn xy(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Point3) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Normalizes an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Feed rates used while emitting a cutting primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutFeeds {
    /// Horizontal cutting feed (mm/min)
    pub feed: f64,
    /// Vertical plunge feed (mm/min)
    pub plunge: f64,
}

/// A drawn cutting primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    Line(Line),
    Arc(Arc),
}

impl Geometry {
    pub fn start(&self) -> Point2 {
        match self {
            Geometry::Line(line) => line.start,
            Geometry::Arc(arc) => arc.start(),
        }
    }

    pub fn end(&self) -> Point2 {
        match self {
            Geometry::Line(line) => line.end,
            Geometry::Arc(arc) => arc.end(),
        }
    }

    /// Milled distance along the primitive.
    pub fn length(&self) -> f64 {
        match self {
            Geometry::Line(line) => line.length(),
            Geometry::Arc(arc) => arc.length(),
        }
    }

    /// The same physical curve drawn in the opposite direction.
    pub fn reversed(&self) -> Geometry {
        match self {
            Geometry::Line(line) => Geometry::Line(line.reversed()),
            Geometry::Arc(arc) => Geometry::Arc(arc.reversed()),
        }
    }

    pub fn transformed(&self, transform: &Transformation2) -> Geometry {
        match self {
            Geometry::Line(line) => Geometry::Line(line.transformed(transform)),
            Geometry::Arc(arc) => Geometry::Arc(arc.transformed(transform)),
        }
    }

    /// Shortest distance from `point` to the curve.
    pub fn distance_to(&self, point: &Point2) -> f64 {
        match self {
            Geometry::Line(line) => line.distance_to(point),
            Geometry::Arc(arc) => arc.distance_to(point),
        }
    }

    /// Name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Line(_) => "Line",
            Geometry::Arc(_) => "Arc",
        }
    }

    /// Splits the primitive into cut runs and support bridges.
    pub fn support_bar_pieces(&self, spec: &BarSpec) -> Vec<SupportBarPiece<Geometry>> {
        match self {
            Geometry::Line(line) => support_bar_pieces(line, spec)
                .into_iter()
                .map(|piece| piece.map(Geometry::Line))
                .collect(),
            Geometry::Arc(arc) => support_bar_pieces(arc, spec)
                .into_iter()
                .map(|piece| piece.map(Geometry::Arc))
                .collect(),
        }
    }

    /// Emits the primitive from `z_start` at its start to `z_end` at its end.
    ///
    /// The head must already be above the start point. It is first brought
    /// to `z_start` (plunging or retracting), then one interpolation move is
    /// written. Returns the advanced head position.
    pub fn emit(
        &self,
        out: &mut GCodeWriter,
        transform: &Transformation3,
        z_start: f64,
        z_end: f64,
        feeds: CutFeeds,
    ) -> Point3 {
        match self {
            Geometry::Line(line) => line.emit(out, transform, z_start, z_end, feeds),
            Geometry::Arc(arc) => arc.emit(out, transform, z_start, z_end, feeds),
        }
    }
}
