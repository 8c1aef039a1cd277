//! Request-scoped batching loader.
//!
//! A [`BatchLoader`] collects keys requested by concurrently resolving fields
//! and turns them into as few [`BatchFetch::fetch`] calls as possible. Keys
//! are deduplicated, outcomes are shared by every caller of the same key and
//! `load_many` output lines up with its input position for position.
//!
//! A loader lives for one request. Create it with the request scope and drop
//! it with the scope; outcomes are never shared across requests.

mod batch_loader;

#[cfg(test)]
mod tests;

pub use batch_loader::{BatchLoader, DEFAULT_MAX_BATCH_SIZE};

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::DomainError;

/// Per-key load failure. Cloned to every caller of the key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The downstream fetch failed for the whole batch.
    #[error("batch fetch failed: {message}")]
    Fetch { message: String },

    /// The downstream source has no value for this key.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// The key itself is malformed; the source was not asked for it.
    #[error("invalid {entity}: {key}")]
    InvalidKey { entity: String, key: String },

    /// The fetcher returned fewer results than keys.
    #[error("no result returned for key {key}")]
    Missing { key: String },

    /// The loader was cancelled before the key resolved.
    #[error("load cancelled")]
    Cancelled,
}

impl From<LoadError> for DomainError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound { entity, key } => DomainError::NotFound { entity, id: key },
            invalid @ LoadError::InvalidKey { .. } => DomainError::validation(invalid.to_string()),
            LoadError::Cancelled => DomainError::Cancelled,
            other => DomainError::upstream(other.to_string()),
        }
    }
}

/// Outcome of loading one key.
pub type LoadResult<V> = Result<V, LoadError>;

/// Downstream source of batched values.
///
/// `fetch` returns one result per key, in key order. A shorter vector marks
/// the trailing keys as missing; an `Err` fails the whole batch.
#[async_trait]
pub trait BatchFetch: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;

    async fn fetch(&self, keys: &[Self::Key]) -> Result<Vec<LoadResult<Self::Value>>, LoadError>;
}
