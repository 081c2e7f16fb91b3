use super::{CutFeeds, Divisible, Point2, Point3};
use crate::gcode::GCodeWriter;
use crate::transform::{Transformation2, Transformation3};
use serde::{Deserialize, Serialize};

/// A straight drawn segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point2,
    pub end: Point2,
}

impl Line {
    pub const fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn reversed(&self) -> Line {
        Line::new(self.end, self.start)
    }

    pub fn transformed(&self, transform: &Transformation2) -> Line {
        Line::new(transform.apply(self.start), transform.apply(self.end))
    }

    /// Point at `distance` from the start, measured along the line.
    pub fn point_at(&self, distance: f64) -> Point2 {
        let length = self.length();
        if length <= f64::EPSILON {
            return self.start;
        }
        self.start.lerp(&self.end, distance / length)
    }

    /// Distance from `point` to the closest point of the segment.
    pub fn distance_to(&self, point: &Point2) -> f64 {
        let d = self.start.vector_to(&self.end);
        let len_sq = d.x * d.x + d.y * d.y;
        if len_sq <= f64::EPSILON {
            return self.start.distance_to(point);
        }
        let v = self.start.vector_to(point);
        let t = ((v.x * d.x + v.y * d.y) / len_sq).clamp(0.0, 1.0);
        self.start.lerp(&self.end, t).distance_to(point)
    }

    pub(crate) fn emit(
        &self,
        out: &mut GCodeWriter,
        transform: &Transformation3,
        z_start: f64,
        z_end: f64,
        feeds: CutFeeds,
    ) -> Point3 {
        let to = transform.apply(self.end);
        out.move_to_height(z_start, feeds.plunge, transform);
        out.mill_line(to, z_end, feeds.feed, transform);
        out.head()
    }
}

impl Divisible for Line {
    fn length(&self) -> f64 {
        Line::length(self)
    }

    fn slice(&self, from: f64, to: f64) -> Self {
        Line::new(self.point_at(from), self.point_at(to))
    }
}
