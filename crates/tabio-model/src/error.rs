//! Error types for column model operations.

use thiserror::Error;

use crate::element::ElementType;

/// Errors raised while converting or combining column values.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A value cannot be represented in the requested element type.
    #[error("cannot convert {value:?} to {target}")]
    Cast { value: String, target: ElementType },

    /// A display format specification could not be parsed.
    #[error("invalid display format: {spec:?}")]
    InvalidFormat { spec: String },

    /// Flat vector data does not divide evenly into rows.
    #[error("vector data of length {len} is not a multiple of width {width}")]
    VectorWidth { len: usize, width: usize },

    /// Two columns with different element types were combined.
    #[error("element type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

impl ModelError {
    /// Create a Cast error.
    pub fn cast(value: impl Into<String>, target: ElementType) -> Self {
        Self::Cast {
            value: value.into(),
            target,
        }
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(spec: impl Into<String>) -> Self {
        Self::InvalidFormat { spec: spec.into() }
    }
}
