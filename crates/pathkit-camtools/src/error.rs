//! Error types for the toolpath compiler.
//!
//! Problems with a drawing are collected as diagnostics and never abort a
//! run. The errors here are the ones that stop the emission of a single
//! path: a value needed to write a move is missing, or a sub-path cannot
//! be placed.

use crate::params::Field;
use pathkit_core::{CoreError, PathName};
use thiserror::Error;

/// Errors that abort the generation of one path.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// A parameter needed to emit a move has no value at any level.
    #[error("{context}: {field} is not set")]
    Unresolved { field: Field, context: String },

    /// A sub-path could not be built.
    #[error("Sub-path {0} is not available")]
    MissingSubPath(PathName),

    /// A path could not be placed between its anchors.
    #[error("Placement failed: {0}")]
    Placement(#[from] CoreError),
}

/// Errors found while reading a parameter value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// The key does not name any field.
    #[error("Unknown parameter '{0}'")]
    UnknownKey(char),

    /// The field exists but is not accepted at this level.
    #[error("Parameter '{key}' is not allowed on {level}")]
    NotAllowed { key: char, level: String },

    /// A `$X` reference has no binding.
    #[error("Variable '${0}' is not bound")]
    Unbound(char),

    /// The value is not a number.
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: char, value: String },
}

/// Result type for toolpath generation.
pub type Result<T> = std::result::Result<T, CamToolError>;
