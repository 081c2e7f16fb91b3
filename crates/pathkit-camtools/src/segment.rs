//! Drawn path elements.
//!
//! A [`RawSegment`] is one element of a path layer as it comes from the
//! drawing: a cut, a hole, a travel, a reference to another path or a bed
//! probe. Segments are plain values; placing one in reverse yields a new
//! segment.

use crate::params::{Level, ParamText};
use pathkit_core::{DiagContext, Geometry, PathName, Point2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentKind {
    /// Line or arc milled along its length, at mark or full depth
    Chain {
        geometry: Geometry,
        #[serde(default)]
        mark: bool,
    },
    /// Round pocket milled as a descending spiral
    Helix {
        center: Point2,
        radius: f64,
        #[serde(default)]
        mark: bool,
    },
    Drill {
        center: Point2,
        #[serde(default)]
        mark: bool,
    },
    /// Travel at sweep height
    Sweep { start: Point2, end: Point2 },
    /// Travel at sweep height, kept apart from forward sweeps in parameters
    BackSweep { start: Point2, end: Point2 },
    /// Another path placed between two points of this one
    SubPath {
        start: Point2,
        end: Point2,
        target: PathName,
    },
    /// Bed probe position; not part of the route
    ZProbe { position: Point2 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    #[serde(flatten)]
    pub kind: SegmentKind,
    /// Explicit ordering among candidates at a branch; lower goes first
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub params: ParamText,
}

impl RawSegment {
    pub fn new(kind: SegmentKind) -> Self {
        Self {
            kind,
            order: None,
            params: ParamText::new(),
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_param(mut self, key: char, value: impl Into<String>) -> Self {
        self.params.insert(key, value.into());
        self
    }

    pub fn start(&self) -> Point2 {
        match &self.kind {
            SegmentKind::Chain { geometry, .. } => geometry.start(),
            SegmentKind::Helix { center, .. } | SegmentKind::Drill { center, .. } => *center,
            SegmentKind::Sweep { start, .. }
            | SegmentKind::BackSweep { start, .. }
            | SegmentKind::SubPath { start, .. } => *start,
            SegmentKind::ZProbe { position } => *position,
        }
    }

    pub fn end(&self) -> Point2 {
        match &self.kind {
            SegmentKind::Chain { geometry, .. } => geometry.end(),
            SegmentKind::Helix { center, .. } | SegmentKind::Drill { center, .. } => *center,
            SegmentKind::Sweep { end, .. }
            | SegmentKind::BackSweep { end, .. }
            | SegmentKind::SubPath { end, .. } => *end,
            SegmentKind::ZProbe { position } => *position,
        }
    }

    /// Fixed rank used to break ties between candidates at a branch.
    pub fn preference(&self) -> u8 {
        match self.kind {
            SegmentKind::Drill { .. } => 0,
            SegmentKind::Helix { .. } => 1,
            SegmentKind::SubPath { .. } => 2,
            SegmentKind::Chain { .. } => 3,
            SegmentKind::Sweep { .. } | SegmentKind::BackSweep { .. } => 4,
            SegmentKind::ZProbe { .. } => 5,
        }
    }

    pub fn length(&self) -> f64 {
        match &self.kind {
            SegmentKind::Chain { geometry, .. } => geometry.length(),
            _ => self.start().distance_to(&self.end()),
        }
    }

    /// The segment travelled from its end to its start.
    pub fn reversed(&self) -> RawSegment {
        let kind = match &self.kind {
            SegmentKind::Chain { geometry, mark } => SegmentKind::Chain {
                geometry: geometry.reversed(),
                mark: *mark,
            },
            SegmentKind::Sweep { start, end } => SegmentKind::Sweep {
                start: *end,
                end: *start,
            },
            SegmentKind::BackSweep { start, end } => SegmentKind::BackSweep {
                start: *end,
                end: *start,
            },
            SegmentKind::SubPath { start, end, target } => SegmentKind::SubPath {
                start: *end,
                end: *start,
                target: target.clone(),
            },
            other => other.clone(),
        };
        RawSegment {
            kind,
            order: self.order,
            params: self.params.clone(),
        }
    }

    pub fn is_probe(&self) -> bool {
        matches!(self.kind, SegmentKind::ZProbe { .. })
    }

    pub fn is_mark(&self) -> bool {
        match self.kind {
            SegmentKind::Chain { mark, .. }
            | SegmentKind::Helix { mark, .. }
            | SegmentKind::Drill { mark, .. } => mark,
            _ => false,
        }
    }

    /// Parameter level of the segment's own overlay.
    pub fn level(&self) -> Level {
        match self.kind {
            SegmentKind::Chain { mark: true, .. } => Level::Mark,
            SegmentKind::Chain { mark: false, .. } => Level::Mill,
            SegmentKind::Helix { .. } => Level::Helix,
            SegmentKind::Drill { .. } => Level::Drill,
            SegmentKind::Sweep { .. } => Level::Sweep,
            SegmentKind::BackSweep { .. } => Level::BackSweep,
            SegmentKind::SubPath { .. } => Level::SubPath,
            SegmentKind::ZProbe { .. } => Level::ZProbe,
        }
    }

    /// Name of the element in messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            SegmentKind::Chain { geometry, .. } => geometry.kind_name(),
            SegmentKind::Helix { .. } => "Helix",
            SegmentKind::Drill { .. } => "Drill",
            SegmentKind::Sweep { .. } => "Sweep",
            SegmentKind::BackSweep { .. } => "BackSweep",
            SegmentKind::SubPath { .. } => "SubPath",
            SegmentKind::ZProbe { .. } => "ZProbe",
        }
    }

    pub fn context(&self, path: &PathName) -> DiagContext {
        DiagContext::element(path, self.kind_name(), self.start())
    }

    /// Candidate ordering at a branch: explicit order, then kind, then length.
    pub fn branch_cmp(&self, other: &RawSegment) -> Ordering {
        let order = |s: &RawSegment| s.order.unwrap_or(i64::MAX);
        order(self)
            .cmp(&order(other))
            .then_with(|| self.preference().cmp(&other.preference()))
            .then_with(|| self.length().total_cmp(&other.length()))
    }
}
