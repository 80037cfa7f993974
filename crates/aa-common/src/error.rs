//! Error types for the common crate.

use thiserror::Error;

/// Result type alias using AaError.
pub type AaResult<T> = Result<T, AaError>;

/// Validation errors raised before any I/O happens.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),
}

impl AaError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_period(msg: impl Into<String>) -> Self {
        Self::InvalidPeriod(msg.into())
    }

    pub fn invalid_bbox(msg: impl Into<String>) -> Self {
        Self::InvalidBbox(msg.into())
    }
}
