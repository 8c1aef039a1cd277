//! In-memory authorization oracle.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashSet;

use super::{AuthorizationOracle, Capability, Resource, Session};
use crate::error::{DomainError, DomainResult};

/// Grant table and visibility pairs held in memory.
///
/// A grant on [`Resource::System`] applies to every resource. Users can
/// always see themselves; other pairs must be allowed explicitly and are
/// symmetric.
#[derive(Debug, Default)]
pub struct MemoryAuthorizer {
    grants: DashSet<(String, Capability, Resource)>,
    visible: DashSet<(String, String)>,
    unavailable: AtomicBool,
}

impl MemoryAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, user_id: impl Into<String>, capability: Capability, resource: Resource) {
        self.grants.insert((user_id.into(), capability, resource));
    }

    pub fn revoke(&self, user_id: &str, capability: Capability, resource: &Resource) {
        self.grants
            .remove(&(user_id.to_string(), capability, resource.clone()));
    }

    pub fn allow_visibility(&self, a: impl Into<String>, b: impl Into<String>) {
        let (a, b) = (a.into(), b.into());
        self.visible.insert((b.clone(), a.clone()));
        self.visible.insert((a, b));
    }

    /// Makes every check fail with an upstream error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> DomainResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::upstream("authorization service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorizationOracle for MemoryAuthorizer {
    async fn has_capability(
        &self,
        session: &Session,
        capability: Capability,
        resource: &Resource,
    ) -> DomainResult<bool> {
        self.check_available()?;
        if session.is_anonymous() {
            return Ok(false);
        }
        let user = session.user_id.clone();
        Ok(self
            .grants
            .contains(&(user.clone(), capability, resource.clone()))
            || self.grants.contains(&(user, capability, Resource::System)))
    }

    async fn can_see_user(&self, viewer: &Session, target_user_id: &str) -> DomainResult<bool> {
        self.check_available()?;
        if viewer.is_anonymous() {
            return Ok(false);
        }
        Ok(viewer.user_id == target_user_id
            || self
                .visible
                .contains(&(viewer.user_id.clone(), target_user_id.to_string())))
    }
}
