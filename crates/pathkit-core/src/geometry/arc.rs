use super::{normalize_degrees, CutFeeds, Divisible, Point2, Point3};
use crate::gcode::GCodeWriter;
use crate::transform::{Transformation2, Transformation3};
use serde::{Deserialize, Serialize};

const SPAN_EPSILON: f64 = 1e-9;

/// A circular arc drawn from `start_angle` to `end_angle`.
///
/// Angles are in degrees, normalized into `[0, 360)`. `ccw` fixes the
/// direction of travel; an arc whose two angles coincide is a full circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    #[serde(default = "default_ccw")]
    pub ccw: bool,
}

fn default_ccw() -> bool {
    true
}

impl Arc {
    pub fn new(center: Point2, radius: f64, start_angle: f64, end_angle: f64, ccw: bool) -> Self {
        Self {
            center,
            radius,
            start_angle: normalize_degrees(start_angle),
            end_angle: normalize_degrees(end_angle),
            ccw,
        }
    }

    fn point_at_angle(&self, degrees: f64) -> Point2 {
        let rad = degrees.to_radians();
        Point2::new(
            self.center.x + self.radius * rad.cos(),
            self.center.y + self.radius * rad.sin(),
        )
    }

    pub fn start(&self) -> Point2 {
        self.point_at_angle(self.start_angle)
    }

    pub fn end(&self) -> Point2 {
        self.point_at_angle(self.end_angle)
    }

    /// Angular span in degrees travelled in the arc's own direction, in `(0, 360]`.
    pub fn sweep_degrees(&self) -> f64 {
        let raw = if self.ccw {
            self.end_angle - self.start_angle
        } else {
            self.start_angle - self.end_angle
        };
        let span = normalize_degrees(raw);
        if span <= SPAN_EPSILON {
            360.0
        } else {
            span
        }
    }

    pub fn length(&self) -> f64 {
        self.radius * self.sweep_degrees().to_radians()
    }

    /// Same curve, opposite direction.
    pub fn reversed(&self) -> Arc {
        Arc {
            center: self.center,
            radius: self.radius,
            start_angle: self.end_angle,
            end_angle: self.start_angle,
            ccw: !self.ccw,
        }
    }

    pub fn transformed(&self, transform: &Transformation2) -> Arc {
        let rotation = transform.rotation_degrees();
        Arc::new(
            transform.apply(self.center),
            self.radius,
            self.start_angle + rotation,
            self.end_angle + rotation,
            self.ccw,
        )
    }

    /// Angle reached after travelling `distance` along the arc.
    pub fn angle_at(&self, distance: f64) -> f64 {
        if self.radius <= f64::EPSILON {
            return self.start_angle;
        }
        let delta = (distance / self.radius).to_degrees();
        if self.ccw {
            normalize_degrees(self.start_angle + delta)
        } else {
            normalize_degrees(self.start_angle - delta)
        }
    }

    pub fn distance_to(&self, point: &Point2) -> f64 {
        let d = self.center.distance_to(point);
        if d <= f64::EPSILON {
            return self.radius;
        }
        let angle = normalize_degrees((point.y - self.center.y).atan2(point.x - self.center.x).to_degrees());
        let offset = if self.ccw {
            normalize_degrees(angle - self.start_angle)
        } else {
            normalize_degrees(self.start_angle - angle)
        };
        if offset <= self.sweep_degrees() {
            (d - self.radius).abs()
        } else {
            self.start()
                .distance_to(point)
                .min(self.end().distance_to(point))
        }
    }

    pub(crate) fn emit(
        &self,
        out: &mut GCodeWriter,
        transform: &Transformation3,
        z_start: f64,
        z_end: f64,
        feeds: CutFeeds,
    ) -> Point3 {
        let moved = self.transformed(transform.planar());
        out.move_to_height(z_start, feeds.plunge, transform);
        out.mill_arc(
            moved.end(),
            moved.center,
            moved.ccw,
            z_end,
            self.length(),
            feeds.feed,
            transform,
        );
        out.head()
    }
}

impl Divisible for Arc {
    fn length(&self) -> f64 {
        Arc::length(self)
    }

    fn slice(&self, from: f64, to: f64) -> Self {
        Arc::new(
            self.center,
            self.radius,
            self.angle_at(from),
            self.angle_at(to),
            self.ccw,
        )
    }
}
