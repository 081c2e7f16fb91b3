//! # PathKit
//!
//! Compiles annotated 2D router drawings into G-code for a CNC router:
//! layered milling with support bridges, drilling, helical holes and
//! non-cutting sweeps, composed from reusable sub-paths placed anywhere on
//! the bed and corrected for an uneven bed through probe measurements.
//!
//! ## Architecture
//!
//! PathKit is organized as a workspace with multiple crates:
//!
//! 1. **pathkit-core** - Geometry, placements, G-code records, diagnostics
//! 2. **pathkit-camtools** - Parameters, path assembly, toolpath generation, optimizer
//! 3. **pathkit** - Job files and the command line driver

pub mod job;

pub use job::{run_file, Job, JobReport};

pub use pathkit_core::{
    format_number, Arc, BedProbe, CoreError, DiagContext, Diagnostic, DiagnosticSink,
    Diagnostics, GCode, GCodeKind, GCodeWriter, Geometry, Line, NullSink, PathName, Point2,
    Point3, Severity, Statistics, TracingSink, Transformation2, Transformation3,
};

pub use pathkit_camtools::{
    assemble, Anchor, AnchorKind, CamToolError, Defaults, Field, GCodeOptimizer, Level,
    ModelBuilder, ParamsChain, PathLayer, PathLibrary, PathModel, Program, RawSegment,
    SegmentKind,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr, leaving stdout to the caller
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
