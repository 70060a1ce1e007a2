//! Error types for backend operations.

use crate::format::FormatError;
use thiserror::Error;

/// Error type for backend operations.
///
/// Groups the failures a cache backend can report so callers can decide
/// whether to treat them as misses or propagate them.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Internal backend error, state or computation error.
    ///
    /// Any error not related to network interaction.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send + Sync>),

    /// Network interaction error.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),

    /// Serialization or deserialization error.
    #[error(transparent)]
    FormatError(#[from] FormatError),

    /// Some sub-writes of a fan-out operation failed.
    ///
    /// The writes that succeeded are not rolled back.
    #[error("{failed} of {total} cache writes failed, first error: {first}")]
    PartialWrite {
        /// Number of failed sub-operations.
        failed: usize,
        /// Number of sub-operations issued.
        total: usize,
        /// The first failure observed.
        #[source]
        first: Box<BackendError>,
    },
}

impl BackendError {
    /// Wraps any error as an internal backend error.
    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BackendError::InternalError(Box::new(error))
    }

    /// Wraps any error as a connection error.
    pub fn connection<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BackendError::ConnectionError(Box::new(error))
    }
}
