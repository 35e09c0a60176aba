//! Error types for block expansion

use thiserror::Error;

/// Result type for block expansion operations
pub type BlockExpandResult<T> = Result<T, BlockExpandError>;

/// Errors raised while configuring or running the transform
#[derive(Debug, Error)]
pub enum BlockExpandError {
    /// Rejected at construction: zero sizes, or a block that never fits.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Rejected per call: input, gradient or boundaries disagree with the geometry.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Tape error: {0}")]
    TapeError(String),
}
