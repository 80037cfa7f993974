//! Error types for grid processing.

use thiserror::Error;

use crate::types::Dim;

/// Errors that can occur during grid processing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// A reporting point lies on or outside the grid extent along one axis.
    #[error("point '{point}' has {axis} {value} outside the grid extent ({min}, {max})")]
    OutOfBounds {
        point: String,
        axis: Dim,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Control and perturbed parts cannot be combined.
    #[error("grid parts are not aligned on {dim}: {reason}")]
    GridAlignment { dim: String, reason: String },

    /// The grid has no such dimension.
    #[error("grid has no {0} dimension")]
    MissingDimension(Dim),

    /// Data shape disagrees with the coordinate vectors.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl GridError {
    /// Create a GridAlignment error.
    pub fn alignment(dim: impl ToString, reason: impl Into<String>) -> Self {
        Self::GridAlignment {
            dim: dim.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }
}

impl From<ndarray::ShapeError> for GridError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ShapeMismatch(err.to_string())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridError>;
