//! G-code records, the writer that produces them, and statistics.
//!
//! Every emitted line is a [`GCode`] record carrying its text together with
//! the distance it travels and the feed it uses, so statistics and the
//! peephole optimizer never have to parse text again.

use crate::geometry::{Point2, Point3};
use crate::transform::Transformation3;
use serde::{Deserialize, Serialize};
use std::fmt;

const Z_EPSILON: f64 = 1e-6;
const XY_EPSILON: f64 = 1e-6;

/// Formats a coordinate with three decimals, never as `-0.000`.
pub fn format_number(value: f64) -> String {
    if value.abs() < 0.0005 {
        "0.000".to_string()
    } else {
        format!("{:.3}", value)
    }
}

/// Classification of an emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GCodeKind {
    /// Non-cutting move that keeps the height
    HorizontalTravel,
    /// Non-cutting move that changes the height
    NonHorizontalTravel,
    /// Cutting move of a milling operation
    Mill,
    /// Cutting move of a drilling operation
    Drill,
    Comment,
    Other,
}

impl GCodeKind {
    /// One-symbol tag used by statistics and pattern rewriting.
    pub fn tag(self) -> char {
        match self {
            GCodeKind::HorizontalTravel => 'T',
            GCodeKind::NonHorizontalTravel => 'V',
            GCodeKind::Mill => 'M',
            GCodeKind::Drill => 'D',
            GCodeKind::Comment => 'C',
            GCodeKind::Other => 'O',
        }
    }

    pub fn is_cutting(self) -> bool {
        matches!(self, GCodeKind::Mill | GCodeKind::Drill)
    }

    pub fn is_travel(self) -> bool {
        matches!(
            self,
            GCodeKind::HorizontalTravel | GCodeKind::NonHorizontalTravel
        )
    }
}

/// One emitted line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GCode {
    pub kind: GCodeKind,
    pub text: String,
    /// Distance travelled by the move (mm)
    pub distance: f64,
    /// Feed rate the move runs at (mm/min), when known
    pub feed: Option<f64>,
}

impl GCode {
    pub fn new(kind: GCodeKind, text: impl Into<String>, distance: f64, feed: Option<f64>) -> Self {
        Self {
            kind,
            text: text.into(),
            distance,
            feed,
        }
    }

    pub fn comment(text: impl AsRef<str>) -> Self {
        Self::new(GCodeKind::Comment, format!("; {}", text.as_ref()), 0.0, None)
    }

    pub fn other(text: impl Into<String>) -> Self {
        Self::new(GCodeKind::Other, text, 0.0, None)
    }

    /// Keeps the line in the output as a comment only.
    pub fn into_comment(self) -> Self {
        if self.kind == GCodeKind::Comment {
            return self;
        }
        Self {
            kind: GCodeKind::Comment,
            text: format!("; {}", self.text),
            distance: self.distance,
            feed: None,
        }
    }

    pub fn tag(&self) -> char {
        self.kind.tag()
    }
}

impl fmt::Display for GCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Running totals over an emitted program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub mill_length: f64,
    pub drill_length: f64,
    pub sweep_length: f64,
    pub mill_minutes: f64,
    pub drill_minutes: f64,
    pub sweep_minutes: f64,
    /// Number of non-comment lines
    pub commands: usize,
}

impl Statistics {
    pub fn from_codes(codes: &[GCode]) -> Self {
        let mut stats = Self::default();
        for code in codes {
            stats.record(code);
        }
        stats
    }

    pub fn record(&mut self, code: &GCode) {
        if code.kind == GCodeKind::Comment {
            return;
        }
        self.commands += 1;
        let minutes = match code.feed {
            Some(feed) if feed > 0.0 => code.distance / feed,
            _ => 0.0,
        };
        match code.kind {
            GCodeKind::Mill => {
                self.mill_length += code.distance;
                self.mill_minutes += minutes;
            }
            GCodeKind::Drill => {
                self.drill_length += code.distance;
                self.drill_minutes += minutes;
            }
            GCodeKind::HorizontalTravel | GCodeKind::NonHorizontalTravel => {
                self.sweep_length += code.distance;
                self.sweep_minutes += minutes;
            }
            GCodeKind::Comment | GCodeKind::Other => {}
        }
    }

    pub fn merge(&mut self, other: &Statistics) {
        self.mill_length += other.mill_length;
        self.drill_length += other.drill_length;
        self.sweep_length += other.sweep_length;
        self.mill_minutes += other.mill_minutes;
        self.drill_minutes += other.drill_minutes;
        self.sweep_minutes += other.sweep_minutes;
        self.commands += other.commands;
    }

    pub fn total_minutes(&self) -> f64 {
        self.mill_minutes + self.drill_minutes + self.sweep_minutes
    }

    /// Machine time rounded up to whole minutes.
    pub fn rounded_minutes(&self) -> u64 {
        self.total_minutes().ceil() as u64
    }
}

/// Appends G-code records while tracking the tool head.
///
/// Positions handed to the writer are world coordinates; heights are
/// nominal and are turned into compensated height words through the
/// [`Transformation3`] passed to each cutting move.
#[derive(Debug, Clone)]
pub struct GCodeWriter {
    codes: Vec<GCode>,
    head: Point3,
}

impl GCodeWriter {
    pub fn new(head: Point3) -> Self {
        Self {
            codes: Vec::new(),
            head,
        }
    }

    pub fn head(&self) -> Point3 {
        self.head
    }

    pub fn codes(&self) -> &[GCode] {
        &self.codes
    }

    pub fn into_codes(self) -> Vec<GCode> {
        self.codes
    }

    pub fn comment(&mut self, text: impl AsRef<str>) {
        self.codes.push(GCode::comment(text));
    }

    pub fn other(&mut self, text: impl Into<String>) {
        self.codes.push(GCode::other(text));
    }

    /// Vertical rapid move.
    pub fn rapid_to_height(&mut self, z: f64) {
        if (self.head.z - z).abs() <= Z_EPSILON {
            return;
        }
        let distance = (self.head.z - z).abs();
        self.codes.push(GCode::new(
            GCodeKind::NonHorizontalTravel,
            format!("G00 Z{}", format_number(z)),
            distance,
            None,
        ));
        self.head.z = z;
    }

    /// Vertical rapid to a height in or at the material, written with the
    /// bed correction at the head position. Rapids to the safe sweep
    /// height use [`rapid_to_height`](Self::rapid_to_height).
    pub fn rapid_to_height_at(&mut self, z: f64, comp: &Transformation3) {
        if (self.head.z - z).abs() <= Z_EPSILON {
            return;
        }
        let distance = (self.head.z - z).abs();
        self.codes.push(GCode::new(
            GCodeKind::NonHorizontalTravel,
            format!("G00 Z{}", comp.height_text(self.head.xy(), z)),
            distance,
            None,
        ));
        self.head.z = z;
    }

    /// Horizontal non-cutting move at the current height: a rapid, or a
    /// feed move when `rate` is given.
    pub fn travel_to(&mut self, to: Point2, rate: Option<f64>) {
        let distance = self.head.xy().distance_to(&to);
        if distance <= XY_EPSILON {
            return;
        }
        let text = match rate {
            Some(rate) => format!(
                "G01 X{} Y{} F{:.1}",
                format_number(to.x),
                format_number(to.y),
                rate
            ),
            None => format!("G00 X{} Y{}", format_number(to.x), format_number(to.y)),
        };
        self.codes.push(GCode::new(
            GCodeKind::HorizontalTravel,
            text,
            distance,
            rate,
        ));
        self.head.x = to.x;
        self.head.y = to.y;
    }

    /// Brings the head to `z` above its current position: cutting plunge
    /// when going down, rapid retract when going up.
    pub fn move_to_height(&mut self, z: f64, plunge_feed: f64, comp: &Transformation3) {
        if self.head.z > z + Z_EPSILON {
            self.plunge(z, plunge_feed, comp);
        } else if self.head.z < z - Z_EPSILON {
            self.rapid_to_height_at(z, comp);
        }
    }

    pub fn plunge(&mut self, z: f64, feed: f64, comp: &Transformation3) {
        self.cut_z(GCodeKind::Mill, z, feed, comp);
    }

    pub fn drill_to(&mut self, z: f64, feed: f64, comp: &Transformation3) {
        self.cut_z(GCodeKind::Drill, z, feed, comp);
    }

    fn cut_z(&mut self, kind: GCodeKind, z: f64, feed: f64, comp: &Transformation3) {
        let distance = (self.head.z - z).abs();
        let height = comp.height_text(self.head.xy(), z);
        self.codes.push(GCode::new(
            kind,
            format!("G01 Z{} F{:.1}", height, feed),
            distance,
            Some(feed),
        ));
        self.head.z = z;
    }

    /// Straight cutting move, possibly sloped.
    pub fn mill_line(&mut self, to: Point2, z: f64, feed: f64, comp: &Transformation3) {
        let target = to.at_height(z);
        let distance = self.head.distance_to(&target);
        self.codes.push(GCode::new(
            GCodeKind::Mill,
            format!(
                "G01 X{} Y{} Z{} F{:.1}",
                format_number(to.x),
                format_number(to.y),
                comp.height_text(to, z),
                feed
            ),
            distance,
            Some(feed),
        ));
        self.head = target;
    }

    /// Circular (or helical, when `z` differs) cutting move around `center`.
    ///
    /// `length` is the planar arc length; a target equal to the head
    /// position describes a full circle.
    #[allow(clippy::too_many_arguments)]
    pub fn mill_arc(
        &mut self,
        to: Point2,
        center: Point2,
        ccw: bool,
        z: f64,
        length: f64,
        feed: f64,
        comp: &Transformation3,
    ) {
        let i = center.x - self.head.x;
        let j = center.y - self.head.y;
        let distance = length.hypot(self.head.z - z);
        self.codes.push(GCode::new(
            GCodeKind::Mill,
            format!(
                "{} X{} Y{} Z{} I{} J{} F{:.1}",
                if ccw { "G03" } else { "G02" },
                format_number(to.x),
                format_number(to.y),
                comp.height_text(to, z),
                format_number(i),
                format_number(j),
                feed
            ),
            distance,
            Some(feed),
        ));
        self.head = to.at_height(z);
    }
}
