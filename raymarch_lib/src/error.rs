use nalgebra::Vector3;
use thiserror::Error;

/// Errors surfaced by configuration and loading.
///
/// Nothing on the per-sample path returns this type; out of bounds
/// reads and missing bricks sample as empty space instead.
#[derive(Error, Debug)]
pub enum RaymarchError {
    /// Malformed or mismatched volume data
    #[error("format error: {0}")]
    Format(String),

    /// Rejected configuration, previous valid state stays active
    #[error("validation error: {0}")]
    Validation(String),

    /// Brick queried explicitly while it is not resident
    #[error("brick {brick:?} is not resident")]
    ResourceUnavailable { brick: Vector3<usize> },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RaymarchError>;

pub(crate) fn format_err(msg: impl Into<String>) -> RaymarchError {
    RaymarchError::Format(msg.into())
}

pub(crate) fn validation_err(msg: impl Into<String>) -> RaymarchError {
    RaymarchError::Validation(msg.into())
}
