//! Layered milling of connected cuts.
//!
//! Consecutive cuts that share one milling setup form a chain. Every cut
//! is split into support bridge pieces, every piece into horizontal layers
//! from the material surface down to its own floor, and the resulting
//! edges are milled in a greedy nearest-first tour that never cuts a layer
//! before the one above it at the same place.

use crate::error::Result;
use crate::params::{Field, ParamsChain};
use pathkit_core::{
    BarSpec, CutFeeds, GCodeWriter, Geometry, PieceRole, Point2, Point3, Transformation3,
};
use tracing::debug;

const DEPTH_EPSILON: f64 = 1e-6;

/// Layer heights from just below `top` down to `floor`, stepping by `step`.
///
/// The last layer is always exactly `floor`. Without a positive step, or
/// when `floor` is not below `top`, the floor is the only layer.
pub fn layer_depths(top: f64, step: Option<f64>, floor: f64) -> Vec<f64> {
    let step = match step {
        Some(step) if step > 0.0 => step,
        _ => return vec![floor],
    };
    let mut depths = Vec::new();
    let mut depth = top - step;
    while depth > floor + DEPTH_EPSILON {
        depths.push(depth);
        depth -= step;
    }
    depths.push(floor);
    depths
}

/// What decides whether two neighbouring cuts belong to one chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainKey {
    pub mark: bool,
    pub top: f64,
    pub step: Option<f64>,
    pub feed: f64,
}

impl ChainKey {
    pub fn of(params: &ParamsChain, mark: bool) -> Result<Self> {
        Ok(Self {
            mark,
            top: params.require(Field::Top)?,
            step: params.get(Field::Step),
            feed: params.require(Field::FeedRate)?,
        })
    }
}

/// One cut of a chain, in path coordinates.
#[derive(Debug, Clone)]
pub struct ChainSegment<'a> {
    pub geometry: Geometry,
    pub mark: bool,
    pub params: &'a ParamsChain,
}

/// One layer of one piece, ready to be milled.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub geometry: Geometry,
    pub z_start: f64,
    pub z_end: f64,
    /// Index of the edge directly above at the same place
    pub above: Option<usize>,
    pub feeds: CutFeeds,
    pub sweep_height: f64,
    pub top: f64,
}

impl Edge {
    fn deepest(&self) -> f64 {
        self.z_start.min(self.z_end)
    }
}

/// Consecutive cuts milled together.
#[derive(Debug, Clone)]
pub struct MillChain<'a> {
    segments: Vec<ChainSegment<'a>>,
}

impl<'a> MillChain<'a> {
    pub fn new(segments: Vec<ChainSegment<'a>>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Chain end in path coordinates.
    pub fn end(&self) -> Option<Point2> {
        self.segments.last().map(|s| s.geometry.end())
    }

    fn pieces(segment: &ChainSegment<'_>) -> Result<Vec<(Geometry, f64, f64)>> {
        let params = segment.params;
        let bottom = params.require(Field::Bottom)?;
        let whole = vec![(segment.geometry, bottom, bottom)];
        if segment.mark {
            return Ok(whole);
        }
        let Some(width) = params.get(Field::BarWidth) else {
            return Ok(whole);
        };
        let spec = BarSpec {
            margin: params.get(Field::BarMargin).unwrap_or(0.0),
            width,
            min_run: params.require(Field::BarRun)?,
            ramp: params.get(Field::BarRamp).unwrap_or(0.0),
        };
        let bridge = bottom + params.require(Field::BarHeight)?;
        let pieces = segment.geometry.support_bar_pieces(&spec);
        if pieces.is_empty() {
            return Ok(whole);
        }
        Ok(pieces
            .into_iter()
            .map(|piece| {
                let (from, to) = match piece.role {
                    PieceRole::Full => (bottom, bottom),
                    PieceRole::RampIn => (bottom, bridge),
                    PieceRole::Bridge => (bridge, bridge),
                    PieceRole::RampOut => (bridge, bottom),
                };
                (piece.geometry, from, to)
            })
            .collect())
    }

    /// Every layer of every piece, each linked to the layer above it.
    pub fn edges(&self) -> Result<Vec<Edge>> {
        let mut edges: Vec<Edge> = Vec::new();
        for segment in &self.segments {
            let params = segment.params;
            let top = params.require(Field::Top)?;
            let step = params.get(Field::Step);
            let feeds = params.feeds()?;
            let sweep_height = params.require(Field::SweepHeight)?;

            for (geometry, floor_start, floor_end) in Self::pieces(segment)? {
                let mut above: Option<usize> = None;
                for depth in layer_depths(top, step, floor_start.min(floor_end)) {
                    let z_start = depth.max(floor_start);
                    let z_end = depth.max(floor_end);
                    if let Some(prev) = above {
                        let last = &edges[prev];
                        if (last.z_start - z_start).abs() < DEPTH_EPSILON
                            && (last.z_end - z_end).abs() < DEPTH_EPSILON
                        {
                            continue;
                        }
                    }
                    edges.push(Edge {
                        geometry,
                        z_start,
                        z_end,
                        above,
                        feeds,
                        sweep_height,
                        top,
                    });
                    above = Some(edges.len() - 1);
                }
            }
        }
        Ok(edges)
    }

    /// Mills the chain, leaving the head over the chain end.
    pub fn emit(&self, out: &mut GCodeWriter, comp: &Transformation3) -> Result<()> {
        let edges = self.edges()?;
        let mut cut = vec![false; edges.len()];
        debug!("mill chain: {} cuts, {} edges", self.segments.len(), edges.len());

        loop {
            let head = out.head();
            let mut best: Option<(usize, bool, f64)> = None;
            for (i, edge) in edges.iter().enumerate() {
                if cut[i] || edge.above.is_some_and(|a| !cut[a]) {
                    continue;
                }
                let start = comp.apply(edge.geometry.start()).at_height(edge.z_start);
                let end = comp.apply(edge.geometry.end()).at_height(edge.z_end);
                for (reversed, point) in [(false, start), (true, end)] {
                    let distance = head.distance_to(&point);
                    if best.is_none_or(|(_, _, d)| distance < d) {
                        best = Some((i, reversed, distance));
                    }
                }
            }
            let Some((index, reversed, _)) = best else {
                break;
            };

            let edge = &edges[index];
            let (geometry, z_start, z_end) = if reversed {
                (edge.geometry.reversed(), edge.z_end, edge.z_start)
            } else {
                (edge.geometry, edge.z_start, edge.z_end)
            };
            travel(out, comp, comp.apply(geometry.start()), edge);
            geometry.emit(out, comp, z_start, z_end, edge.feeds);
            cut[index] = true;
        }

        if let (Some(end), Some(last)) = (self.end(), self.segments.last()) {
            let end = comp.apply(end);
            if !out.head().xy().coincides(&end) {
                let sweep_height = last.params.require(Field::SweepHeight)?;
                if out.head().z < sweep_height {
                    out.rapid_to_height(sweep_height);
                }
                out.travel_to(end, None);
            }
        }
        Ok(())
    }
}

/// Moves the head over `to`, lifting to sweep height when it has to move
/// sideways, and lowers it to the surface.
fn travel(out: &mut GCodeWriter, comp: &Transformation3, to: Point2, edge: &Edge) {
    let head: Point3 = out.head();
    if !head.xy().coincides(&to) {
        if head.z < edge.sweep_height {
            out.rapid_to_height(edge.sweep_height);
        }
        out.travel_to(to, None);
    }
    if out.head().z > edge.top && edge.deepest() < edge.top {
        out.rapid_to_height_at(edge.top, comp);
    }
}
