//! Error handling for PathKit core
//!
//! Errors raised by geometric operations that cannot produce a result,
//! such as placing a path between anchors that are further apart than
//! the drawn ones.

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The drawn and placed anchor pairs are not the same distance apart
    #[error("Anchor distance mismatch: drawn {drawn:.3} mm, placed {placed:.3} mm")]
    AnchorDistanceMismatch {
        /// Distance between the anchors in the source coordinates.
        drawn: f64,
        /// Distance between the anchors in the target coordinates.
        placed: f64,
    },

    /// A primitive cannot be built from the given values
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
