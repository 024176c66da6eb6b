//! Error types for kdindex.
//!
//! Every error in this crate is a precondition or programming error: the index
//! is a pure computation over immutable data, so nothing here is transient and
//! nothing is retried.

use thiserror::Error;

/// Errors raised while building or querying an index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Dimensionality must be at least 1.
    #[error("Invalid dimension: {0} (must be >= 1)")]
    InvalidDimension(usize),

    /// A vector or query does not match the collection dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the indexed collection.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// A vector contains NaN or an infinite coordinate.
    #[error("Non-finite vector: {0}")]
    NonFiniteVector(String),

    /// The identifier is already present in the collection.
    #[error("Duplicate id: {0}")]
    DuplicateId(u64),

    /// The Minkowski exponent does not define a norm.
    #[error("Invalid norm: {0}")]
    InvalidNorm(String),

    /// A size or count does not fit the target integer type.
    #[error("Overflow: {0}")]
    Overflow(String),

    /// The implicit tree does not satisfy the partition invariant.
    #[error("Partition violation: {0}")]
    PartitionViolation(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for errors caused by malformed caller input, as opposed to
    /// a corrupted index or a bad configuration.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidDimension(_)
                | Self::DimensionMismatch { .. }
                | Self::NonFiniteVector(_)
                | Self::DuplicateId(_)
                | Self::InvalidNorm(_)
                | Self::Overflow(_)
        )
    }
}

/// Result type alias for kdindex operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Checks that `vector` has `expected` components, all finite.
pub(crate) fn validate_vector(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    if let Some(axis) = vector.iter().position(|x| !x.is_finite()) {
        return Err(Error::NonFiniteVector(format!(
            "coordinate {axis} is {}",
            vector[axis]
        )));
    }
    Ok(())
}
