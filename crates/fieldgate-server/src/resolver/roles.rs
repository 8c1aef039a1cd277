//! Batched role lookups.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fieldgate_domain::{BatchFetch, LoadError, LoadResult};
use fieldgate_storage::{DataStore, Role};
use tracing::debug;

/// Longest accepted role name.
pub const MAX_ROLE_NAME_LENGTH: usize = 64;

/// Role names are lowercase ASCII letters, digits and underscores.
pub fn is_valid_role_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_ROLE_NAME_LENGTH
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Fetches roles by name for the roles loader.
///
/// The store returns roles in no particular order and skips unknown names,
/// so results are re-aligned to the requested names here.
pub struct RoleFetcher<S> {
    store: Arc<S>,
}

impl<S> RoleFetcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: DataStore> BatchFetch for RoleFetcher<S> {
    type Key = String;
    type Value = Role;

    async fn fetch(&self, names: &[String]) -> Result<Vec<LoadResult<Role>>, LoadError> {
        let valid: Vec<String> = names
            .iter()
            .filter(|name| is_valid_role_name(name))
            .cloned()
            .collect();

        let mut by_name: HashMap<String, Role> = HashMap::with_capacity(valid.len());
        if !valid.is_empty() {
            let roles = self
                .store
                .get_roles_by_names(&valid)
                .await
                .map_err(|e| LoadError::Fetch {
                    message: e.to_string(),
                })?;
            by_name.extend(roles.into_iter().map(|role| (role.name.clone(), role)));
        }
        debug!(
            requested = names.len(),
            found = by_name.len(),
            "fetched roles"
        );

        Ok(names
            .iter()
            .map(|name| {
                if !is_valid_role_name(name) {
                    return Err(LoadError::InvalidKey {
                        entity: "role name".to_string(),
                        key: name.clone(),
                    });
                }
                by_name.get(name).cloned().ok_or_else(|| LoadError::NotFound {
                    entity: "role".to_string(),
                    key: name.clone(),
                })
            })
            .collect())
    }
}
