//! Client-facing error classification.
//!
//! Every field that fails is reported as a [`FieldError`] with a stable
//! [`ErrorKind`] and a message whose detail depends on [`ErrorConfig`].
//! Upstream failures (data store, authorization oracle) are logged in full
//! but reach clients only as a generic message unless detailed errors are
//! enabled.
//!
//! ```rust
//! use fieldgate_domain::DomainError;
//! use fieldgate_server::errors::{classify_domain_error_with_config, ErrorConfig, ErrorKind};
//!
//! let err = DomainError::upstream("connection refused to 10.0.0.3:5432");
//!
//! let classified = classify_domain_error_with_config(&err, &ErrorConfig::production());
//! assert_eq!(classified.kind, ErrorKind::Upstream);
//! assert!(!classified.message.contains("10.0.0.3"));
//!
//! let classified = classify_domain_error_with_config(&err, &ErrorConfig::development());
//! assert!(classified.message.contains("10.0.0.3"));
//! ```

use fieldgate_domain::DomainError;
use serde::Serialize;

/// Controls whether internal error detail is exposed to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorConfig {
    pub detailed_errors: bool,
}

impl ErrorConfig {
    /// Hide internal details. The default.
    pub fn production() -> Self {
        Self {
            detailed_errors: false,
        }
    }

    pub fn development() -> Self {
        Self {
            detailed_errors: true,
        }
    }
}

/// Stable error category reported with each failed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Forbidden,
    NotFound,
    Upstream,
    PartialBatch,
    Timeout,
    Cancelled,
}

impl ErrorKind {
    /// Whether the client may retry the same query unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Upstream | ErrorKind::PartialBatch | ErrorKind::Timeout
        )
    }
}

/// A classified error ready for the response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Classifies with production settings.
pub fn classify_domain_error(err: &DomainError) -> ClassifiedError {
    classify_domain_error_with_config(err, &ErrorConfig::production())
}

pub fn classify_domain_error_with_config(
    err: &DomainError,
    config: &ErrorConfig,
) -> ClassifiedError {
    let kind = error_kind(err);
    if config.detailed_errors {
        return ClassifiedError::new(kind, err.to_string());
    }

    // Validation and denial messages describe the client's own request;
    // everything else is reduced to a generic message.
    let message = match err {
        DomainError::Validation { .. } | DomainError::Forbidden { .. } => err.to_string(),
        DomainError::NotFound { entity, .. } => format!("{entity} not found"),
        DomainError::Upstream { .. } => "internal error".to_string(),
        DomainError::PartialBatch { .. } => "related records could not be loaded".to_string(),
        DomainError::Timeout { .. } => "request timed out".to_string(),
        DomainError::Cancelled => "request cancelled".to_string(),
    };
    ClassifiedError::new(kind, message)
}

fn error_kind(err: &DomainError) -> ErrorKind {
    match err {
        DomainError::Validation { .. } => ErrorKind::Validation,
        DomainError::Forbidden { .. } => ErrorKind::Forbidden,
        DomainError::NotFound { .. } => ErrorKind::NotFound,
        DomainError::Upstream { .. } => ErrorKind::Upstream,
        DomainError::PartialBatch { .. } => ErrorKind::PartialBatch,
        DomainError::Timeout { .. } => ErrorKind::Timeout,
        DomainError::Cancelled => ErrorKind::Cancelled,
    }
}

/// One failed field in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path of the field, e.g. `channelMembers.roles`.
    pub path: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn from_domain(path: impl Into<String>, err: &DomainError, config: &ErrorConfig) -> Self {
        let classified = classify_domain_error_with_config(err, config);
        Self {
            path: path.into(),
            kind: classified.kind,
            message: classified.message,
        }
    }
}
