//! Error types for Weir.

use thiserror::Error;

/// Result type alias for Weir operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Failure reported by a row source, kept opaque to this crate.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for stream construction and execution.
#[derive(Debug, Error)]
pub enum Error {
    /// A field, predicate or stream was built from invalid parts.
    #[error("Validation failed: {message}")]
    Validation { message: String },
    /// The row source failed to execute the pushed query.
    #[error("Query execution failed for entity {entity}")]
    QueryExecution {
        entity: String,
        #[source]
        source: SourceError,
    },
    /// An operation was invoked on a stream that can no longer accept it.
    #[error("Illegal state: {message}")]
    IllegalState { message: String },
}

impl Error {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Creates a query execution error wrapping the row source's failure.
    pub fn query_execution(entity: impl Into<String>, source: impl Into<SourceError>) -> Self {
        Error::QueryExecution {
            entity: entity.into(),
            source: source.into(),
        }
    }

    /// Creates an illegal state error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Error::IllegalState {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if this is an illegal state error.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState { .. })
    }
}
