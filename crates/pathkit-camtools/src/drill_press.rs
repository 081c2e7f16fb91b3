//! Drilling and helical hole cycles.
//!
//! A drill element is plunged straight down, in pecks when a step is set.
//! A helix element mills a round hole wider than the bit by spiralling down
//! along a circle, finishing with one full circle at the floor and a move
//! back to the center.

use crate::error::Result;
use crate::params::{Field, ParamsChain};
use pathkit_core::{GCodeWriter, Point2, Transformation3, POSITION_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Clearance kept above the last peck when going back in (mm)
const PECK_CLEARANCE: f64 = 0.5;

/// Helix pitch when no step is set (mm per turn)
const DEFAULT_PITCH: f64 = 1.0;

/// Parameters of a drilling or helical cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillPressParameters {
    /// Z coordinate of the material surface (mm)
    pub top_z: f64,
    /// Final depth of the hole (mm)
    pub bottom_z: f64,
    /// Maximum depth of each plunge (mm). Set to 0 for no pecking.
    pub peck_depth: f64,
    /// Feed rate for vertical movement (mm/min)
    pub plunge_rate: f64,
    /// Feed rate for horizontal movement during helical cycles (mm/min)
    pub feed_rate: f64,
    /// Height for safe travel between locations (mm)
    pub safe_z: f64,
}

impl DrillPressParameters {
    /// Reads the cycle parameters resolved for one element.
    pub fn from_params(params: &ParamsChain) -> Result<Self> {
        let feeds = params.feeds()?;
        Ok(Self {
            top_z: params.require(Field::Top)?,
            bottom_z: params.require(Field::Bottom)?,
            peck_depth: params.get(Field::Step).unwrap_or(0.0),
            plunge_rate: feeds.plunge,
            feed_rate: feeds.feed,
            safe_z: params.require(Field::SweepHeight)?,
        })
    }
}

/// Writes drilling cycles at world positions.
#[derive(Debug, Clone)]
pub struct DrillPressGenerator {
    params: DrillPressParameters,
}

impl DrillPressGenerator {
    pub fn new(params: DrillPressParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DrillPressParameters {
        &self.params
    }

    /// Brings the head over `center` at the material surface.
    fn approach(&self, out: &mut GCodeWriter, comp: &Transformation3, center: Point2) {
        let p = &self.params;
        if !out.head().xy().coincides(&center) {
            if out.head().z < p.safe_z {
                out.rapid_to_height(p.safe_z);
            }
            out.travel_to(center, None);
        }
        if out.head().z > p.top_z {
            out.rapid_to_height_at(p.top_z, comp);
        } else {
            out.move_to_height(p.top_z, p.plunge_rate, comp);
        }
    }

    /// Standard or peck drilling at `center`, ending at safe height.
    pub fn drill(&self, out: &mut GCodeWriter, comp: &Transformation3, center: Point2) {
        let p = &self.params;
        self.approach(out, comp, center);

        if p.peck_depth <= 0.0 {
            out.comment("Simple drilling cycle");
            out.drill_to(p.bottom_z, p.plunge_rate, comp);
        } else {
            out.comment("Peck drilling cycle");
            let mut current_z = p.top_z;
            while current_z > p.bottom_z {
                current_z -= p.peck_depth;
                if current_z < p.bottom_z {
                    current_z = p.bottom_z;
                }
                out.drill_to(current_z, p.plunge_rate, comp);
                out.rapid_to_height_at(p.top_z, comp);
                if current_z > p.bottom_z {
                    out.rapid_to_height_at(current_z + PECK_CLEARANCE, comp);
                }
            }
        }
        out.rapid_to_height(p.safe_z);
    }

    /// Helical milling of a hole of `hole_radius` around `center`.
    ///
    /// Holes not wider than the tool are drilled instead.
    pub fn helix(
        &self,
        out: &mut GCodeWriter,
        comp: &Transformation3,
        center: Point2,
        hole_radius: f64,
        tool_diameter: f64,
    ) {
        let p = &self.params;
        let radius = hole_radius - tool_diameter / 2.0;
        if radius <= POSITION_TOLERANCE {
            out.comment(format!(
                "Hole radius {:.3} not wider than tool, drilling instead",
                hole_radius
            ));
            self.drill(out, comp, center);
            return;
        }

        out.comment("Helical interpolation cycle");
        let start = Point2::new(center.x + radius, center.y);
        if out.head().z < p.safe_z {
            out.rapid_to_height(p.safe_z);
        }
        out.travel_to(start, None);
        if out.head().z > p.top_z {
            out.rapid_to_height_at(p.top_z, comp);
        }

        let pitch = if p.peck_depth > 0.0 {
            p.peck_depth
        } else {
            DEFAULT_PITCH
        };
        let turn = 2.0 * PI * radius;
        let mut current_z = p.top_z;
        while current_z > p.bottom_z {
            current_z -= pitch;
            if current_z < p.bottom_z {
                current_z = p.bottom_z;
            }
            out.mill_arc(start, center, false, current_z, turn, p.feed_rate, comp);
        }

        // Final full circle at the floor
        out.mill_arc(start, center, false, p.bottom_z, turn, p.feed_rate, comp);
        out.mill_line(center, p.bottom_z, p.feed_rate, comp);
        out.rapid_to_height(p.safe_z);
    }
}
