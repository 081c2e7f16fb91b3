//! Support bridge layout for full-depth cuts.
//!
//! A cut-out part stays tacked to the surrounding stock by short bridges
//! that are milled shallower than the rest of the contour. The span of a
//! primitive is divided into equal cells, each at least `width + min_run`
//! long, and one bridge is centred in every cell. A ramp of `ramp` length
//! on each side of a bridge carries the depth transition.

/// Bridge layout parameters, all lengths in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSpec {
    /// Bridge-free length kept at both extremes of the primitive
    pub margin: f64,
    /// Length of each bridge
    pub width: f64,
    /// Minimum unsupported run that earns one bridge
    pub min_run: f64,
    /// Length of the sloped transition on each side of a bridge
    pub ramp: f64,
}

/// What a decomposed piece is milled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceRole {
    /// Milled to the full floor
    Full,
    /// Rises from the full floor to the bridge top
    RampIn,
    /// Milled only down to the bridge top
    Bridge,
    /// Falls from the bridge top back to the full floor
    RampOut,
}

/// One piece of a primitive split by [`support_bar_pieces`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportBarPiece<G> {
    pub role: PieceRole,
    pub geometry: G,
}

impl<G> SupportBarPiece<G> {
    pub fn map<H>(self, f: impl FnOnce(G) -> H) -> SupportBarPiece<H> {
        SupportBarPiece {
            role: self.role,
            geometry: f(self.geometry),
        }
    }
}

/// Shapes that can be cut into sub-shapes by distance along their length.
pub trait Divisible: Sized {
    fn length(&self) -> f64;

    /// The part of the shape between two distances from its start.
    fn slice(&self, from: f64, to: f64) -> Self;
}

const LENGTH_EPSILON: f64 = 1e-9;

/// Splits `shape` into alternating full runs and bridges.
///
/// Returns an empty vector when the shape is too short to carry a bridge;
/// the caller then mills it as a single full run.
pub fn support_bar_pieces<G: Divisible>(shape: &G, spec: &BarSpec) -> Vec<SupportBarPiece<G>> {
    layout(shape.length(), spec)
        .into_iter()
        .map(|(role, from, to)| SupportBarPiece {
            role,
            geometry: shape.slice(from, to),
        })
        .collect()
}

fn layout(length: f64, spec: &BarSpec) -> Vec<(PieceRole, f64, f64)> {
    let cell_min = spec.width + spec.min_run;
    if length.is_nan() || length <= 0.0 || cell_min <= 0.0 || spec.width <= 0.0 {
        return Vec::new();
    }

    let count = ((length + LENGTH_EPSILON) / cell_min).floor() as usize;
    if count == 0 {
        return Vec::new();
    }

    let cell = length / count as f64;
    let ramp = spec.ramp.max(0.0);
    let outer_run = (cell - spec.width) / 2.0 - ramp;
    if outer_run + LENGTH_EPSILON < spec.margin.max(0.0) || outer_run < 0.0 {
        return Vec::new();
    }

    let mut pieces = Vec::with_capacity(4 * count + 1);
    let mut cursor = 0.0;
    for k in 0..count {
        let bridge_start = k as f64 * cell + (cell - spec.width) / 2.0;
        let bridge_end = bridge_start + spec.width;

        pieces.push((PieceRole::Full, cursor, bridge_start - ramp));
        if ramp > LENGTH_EPSILON {
            pieces.push((PieceRole::RampIn, bridge_start - ramp, bridge_start));
        }
        pieces.push((PieceRole::Bridge, bridge_start, bridge_end));
        if ramp > LENGTH_EPSILON {
            pieces.push((PieceRole::RampOut, bridge_end, bridge_end + ramp));
        }
        cursor = bridge_end + ramp;
    }
    pieces.push((PieceRole::Full, cursor, length));
    pieces
}
