//! Placement of local path coordinates into the world.
//!
//! A [`Transformation2`] is the rigid map that carries one anchor pair
//! onto another (rotation plus translation, no scaling or mirroring).
//! A [`Transformation3`] adds bed-height compensation: cutting heights
//! are written as expressions over the values a probing run stores in
//! numbered machine parameters.

use crate::error::{CoreError, Result};
use crate::gcode::format_number;
use crate::geometry::{Point2, POSITION_TOLERANCE};

/// First machine parameter number used for probe measurements.
/// Probe `i` of a program reads `#(PROBE_VARIABLE_BASE + i)`.
pub const PROBE_VARIABLE_BASE: u32 = 1000;

/// Planar similarity transformation (rotation + translation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformation2 {
    cos: f64,
    sin: f64,
    offset: Point2,
}

impl Default for Transformation2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformation2 {
    pub const fn identity() -> Self {
        Self {
            cos: 1.0,
            sin: 0.0,
            offset: Point2::new(0.0, 0.0),
        }
    }

    /// Rotation by `degrees` about the origin followed by a translation.
    pub fn rotation_translation(degrees: f64, offset: Point2) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self { cos, sin, offset }
    }

    /// The map carrying `from_start` onto `to_start` and `from_end` onto `to_end`.
    ///
    /// Both pairs must be the same distance apart. Coincident anchors on
    /// both sides give a pure translation.
    pub fn from_anchors(
        from_start: Point2,
        from_end: Point2,
        to_start: Point2,
        to_end: Point2,
    ) -> Result<Self> {
        let a = from_start.vector_to(&from_end);
        let b = to_start.vector_to(&to_end);
        let drawn = a.x.hypot(a.y);
        let placed = b.x.hypot(b.y);
        if (drawn - placed).abs() > POSITION_TOLERANCE {
            return Err(CoreError::AnchorDistanceMismatch { drawn, placed });
        }

        let angle = if drawn <= POSITION_TOLERANCE {
            0.0
        } else {
            (a.x * b.y - a.y * b.x).atan2(a.x * b.x + a.y * b.y)
        };
        let (sin, cos) = angle.sin_cos();
        let rotated = Point2::new(
            cos * from_start.x - sin * from_start.y,
            sin * from_start.x + cos * from_start.y,
        );
        Ok(Self {
            cos,
            sin,
            offset: Point2::new(to_start.x - rotated.x, to_start.y - rotated.y),
        })
    }

    pub fn apply(&self, p: Point2) -> Point2 {
        Point2::new(
            self.cos * p.x - self.sin * p.y + self.offset.x,
            self.sin * p.x + self.cos * p.y + self.offset.y,
        )
    }

    /// Counterclockwise rotation angle in degrees, in `(-180, 180]`.
    pub fn rotation_degrees(&self) -> f64 {
        self.sin.atan2(self.cos).to_degrees()
    }

    /// `self` followed by `outer`.
    pub fn then(&self, outer: &Transformation2) -> Transformation2 {
        Transformation2 {
            cos: outer.cos * self.cos - outer.sin * self.sin,
            sin: outer.sin * self.cos + outer.cos * self.sin,
            offset: outer.apply(self.offset),
        }
    }
}

/// A bed height measurement point, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BedProbe {
    pub position: Point2,
    /// Surface height expected at the probe; the correction is
    /// the measured height minus this value.
    pub target_height: f64,
}

/// Planar placement plus bed-height compensation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transformation3 {
    planar: Transformation2,
    probes: Vec<BedProbe>,
}

impl Transformation3 {
    pub fn new(planar: Transformation2) -> Self {
        Self {
            planar,
            probes: Vec::new(),
        }
    }

    pub fn with_probes(planar: Transformation2, probes: Vec<BedProbe>) -> Self {
        Self { planar, probes }
    }

    pub fn planar(&self) -> &Transformation2 {
        &self.planar
    }

    pub fn probes(&self) -> &[BedProbe] {
        &self.probes
    }

    pub fn has_compensation(&self) -> bool {
        !self.probes.is_empty()
    }

    /// Places local coordinates of a nested path: `inner` then `self`.
    pub fn nested(&self, inner: &Transformation2) -> Transformation3 {
        Transformation3 {
            planar: inner.then(&self.planar),
            probes: self.probes.clone(),
        }
    }

    pub fn apply(&self, p: Point2) -> Point2 {
        self.planar.apply(p)
    }

    /// Normalized inverse-distance weights of the probes at `world`.
    fn weights(&self, world: Point2) -> Vec<(usize, f64)> {
        if let Some(i) = self
            .probes
            .iter()
            .position(|p| p.position.distance_to(&world) <= POSITION_TOLERANCE)
        {
            return vec![(i, 1.0)];
        }
        let raw: Vec<f64> = self
            .probes
            .iter()
            .map(|p| 1.0 / p.position.distance_to(&world).powi(2))
            .collect();
        let sum: f64 = raw.iter().sum();
        raw.into_iter()
            .enumerate()
            .map(|(i, w)| (i, w / sum))
            .collect()
    }

    /// Height word for a cutting move ending at `world`.
    ///
    /// Without probes this is the plain number. With probes it is an
    /// expression adding the weighted probe corrections to `nominal`.
    pub fn height_text(&self, world: Point2, nominal: f64) -> String {
        let weights = self.weights(world);
        if weights.is_empty() {
            return format_number(nominal);
        }
        let mut expr = format!("[{}", format_number(nominal));
        for (i, w) in weights {
            let probe = &self.probes[i];
            let variable = PROBE_VARIABLE_BASE + i as u32;
            let target = probe.target_height;
            let correction = if target < 0.0 {
                format!("#{}+{}", variable, format_number(-target))
            } else {
                format!("#{}-{}", variable, format_number(target))
            };
            expr.push_str(&format!("+{:.4}*[{}]", w, correction));
        }
        expr.push(']');
        expr
    }

    /// Numeric value of [`height_text`](Self::height_text) once the probe
    /// heights are known. Missing measurements contribute no correction.
    pub fn height_at(&self, world: Point2, nominal: f64, measured: &[f64]) -> f64 {
        self.weights(world)
            .into_iter()
            .map(|(i, w)| {
                let target = self.probes[i].target_height;
                w * (measured.get(i).copied().unwrap_or(target) - target)
            })
            .sum::<f64>()
            + nominal
    }
}
