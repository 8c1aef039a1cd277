//! Domain error types for field resolution.

use fieldgate_storage::StorageError;
use thiserror::Error;

use crate::authz::Capability;

/// Domain-specific errors raised while resolving a field.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Client input rejected (malformed cursor, page size out of bounds).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The authorization gate denied the field.
    #[error("forbidden: missing capability {capability}")]
    Forbidden { capability: Capability },

    /// Target entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Data store or authorization oracle failure. Retryable by the caller.
    #[error("upstream error: {message}")]
    Upstream { message: String },

    /// Some keys of a batched lookup failed; the first failure is reported.
    #[error("{failed} of {total} batched lookups failed, first: {first}")]
    PartialBatch {
        failed: usize,
        total: usize,
        first: String,
    },

    /// Request deadline elapsed.
    #[error("timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The request window was cancelled.
    #[error("request cancelled")]
    Cancelled,
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        DomainError::Upstream {
            message: message.into(),
        }
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => DomainError::NotFound {
                entity: entity.to_string(),
                id,
            },
            StorageError::InvalidInput { message } => DomainError::Validation { message },
            other => DomainError::Upstream {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
