//! Partial-result response envelope.

use fieldgate_domain::DomainResult;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::errors::{ErrorConfig, ErrorKind, FieldError};

/// Assembled result of one query: data for fields that resolved and one
/// error per field that did not.
///
/// A failing field never removes its siblings; its slot in `data` is `null`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResponse {
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(skip)]
    error_config: ErrorConfig,
}

impl QueryResponse {
    pub fn new(error_config: ErrorConfig) -> Self {
        Self {
            error_config,
            ..Default::default()
        }
    }

    /// Records the outcome of the field at `path`.
    pub fn resolve<T: Serialize>(&mut self, path: &str, result: DomainResult<T>) -> &mut Self {
        let err = match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(value) => {
                    self.data.insert(path.to_string(), value);
                    return self;
                }
                Err(e) => fieldgate_domain::DomainError::upstream(format!(
                    "failed to serialize field: {e}"
                )),
            },
            Err(err) => err,
        };

        let field_error = FieldError::from_domain(path, &err, &self.error_config);
        if field_error.kind == ErrorKind::Upstream {
            error!(path, error = %err, "field resolution failed");
        } else {
            debug!(path, kind = ?field_error.kind, error = %err, "field resolution failed");
        }
        self.data.insert(path.to_string(), Value::Null);
        self.errors.push(field_error);
        self
    }

    /// True when at least one field failed.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_for(&self, path: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.path == path)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
