//! # PathKit CAM Tools
//!
//! Compiles drawn path layers into G-code.
//!
//! ## Stages
//!
//! - **Parameters**: layered one-letter parameter overlays resolved per element
//! - **Assembler**: orders the unordered elements of a layer into one route
//! - **Mill Chain**: layered milling of connected cuts with support bridges
//! - **Drill Press**: drilling, peck drilling and helical hole cycles
//! - **Model**: path library, sub-path placement and program generation
//! - **Optimizer**: removal of dead travel moves through the pattern matcher

pub mod assembler;
pub mod drill_press;
pub mod error;
pub mod mill_chain;
pub mod model;
pub mod optimizer;
pub mod params;
pub mod pattern;
pub mod segment;

pub use assembler::{assemble, Assembly};
pub use drill_press::{DrillPressGenerator, DrillPressParameters};
pub use error::{CamToolError, ParameterError, Result};
pub use mill_chain::{layer_depths, ChainKey, ChainSegment, Edge, MillChain};
pub use model::{
    Anchor, AnchorKind, ModelBuilder, PathLayer, PathLibrary, PathModel, PathSegment, Program,
    MAX_NESTING, PROBE_TRAVEL,
};
pub use optimizer::GCodeOptimizer;
pub use params::{Bindings, Defaults, Field, Level, Overlay, ParamText, ParamsChain};
pub use pattern::Pattern;
pub use segment::{RawSegment, SegmentKind};
