//! # PathKit Core
//!
//! Core types for the PathKit toolpath compiler.
//! Provides the planar geometry drawn by the user, the similarity
//! transformations used to place paths, the G-code record stream produced
//! by emission, and the diagnostics collected while compiling.

pub mod diagnostics;
pub mod error;
pub mod gcode;
pub mod geometry;
pub mod path_name;
pub mod transform;

pub use diagnostics::{
    DiagContext, Diagnostic, DiagnosticSink, Diagnostics, NullSink, Severity, TracingSink,
};
pub use error::{CoreError, Result};
pub use gcode::{format_number, GCode, GCodeKind, GCodeWriter, Statistics};
pub use geometry::{
    normalize_degrees, support_bar_pieces, Arc, BarSpec, CutFeeds, Divisible, Geometry, Line,
    PieceRole, Point2, Point3, SupportBarPiece, POSITION_TOLERANCE,
};
pub use path_name::PathName;
pub use transform::{BedProbe, Transformation2, Transformation3, PROBE_VARIABLE_BASE};
