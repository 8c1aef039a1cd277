//! Per-request authorization checks.

use tracing::{debug, warn};

use super::{
    AuthorizationDecision, AuthorizationOracle, Capability, DeniedReason, Resource, Session,
};
use crate::error::{DomainError, DomainResult};

/// Borrows the oracle and the session for the duration of one field.
pub struct AuthorizationGate<'a, A: ?Sized> {
    oracle: &'a A,
    session: &'a Session,
}

impl<'a, A> AuthorizationGate<'a, A>
where
    A: AuthorizationOracle + ?Sized,
{
    pub fn new(oracle: &'a A, session: &'a Session) -> Self {
        Self { oracle, session }
    }

    pub fn session(&self) -> &Session {
        self.session
    }

    /// Evaluates a single capability without failing on denial.
    pub async fn decide(
        &self,
        capability: Capability,
        resource: &Resource,
    ) -> DomainResult<AuthorizationDecision> {
        if self
            .oracle
            .has_capability(self.session, capability, resource)
            .await?
        {
            Ok(AuthorizationDecision::allow())
        } else {
            Ok(AuthorizationDecision::deny(DeniedReason::MissingCapability(
                capability,
            )))
        }
    }

    /// Fails with `Forbidden` unless the session holds `capability`.
    pub async fn require(&self, capability: Capability, resource: &Resource) -> DomainResult<()> {
        let decision = self.decide(capability, resource).await?;
        self.enforce(decision, capability, resource)
    }

    /// Passes if any of `alternatives` is held; denial reports `reported`.
    ///
    /// Alternatives are checked in order and evaluation stops at the first
    /// grant.
    pub async fn require_any(
        &self,
        alternatives: &[(Capability, Resource)],
        reported: Capability,
        reported_on: &Resource,
    ) -> DomainResult<()> {
        for (capability, resource) in alternatives {
            if self
                .oracle
                .has_capability(self.session, *capability, resource)
                .await?
            {
                debug!(
                    user_id = %self.session.user_id,
                    capability = %capability,
                    resource = %resource,
                    "authorization granted"
                );
                return Ok(());
            }
        }
        self.enforce(
            AuthorizationDecision::deny(DeniedReason::MissingCapability(reported)),
            reported,
            reported_on,
        )
    }

    /// True when the session is `user_id` or may edit other users.
    pub async fn has_user_access(&self, user_id: &str) -> DomainResult<bool> {
        if !self.session.is_anonymous() && self.session.user_id == user_id {
            return Ok(true);
        }
        self.oracle
            .has_capability(
                self.session,
                Capability::EditOtherUsers,
                &Resource::user(user_id),
            )
            .await
    }

    /// Self-access or `EditOtherUsers` on the target user.
    pub async fn require_user_access(&self, user_id: &str) -> DomainResult<()> {
        let resource = Resource::user(user_id);
        let decision = if self.has_user_access(user_id).await? {
            AuthorizationDecision::allow()
        } else {
            AuthorizationDecision::deny(DeniedReason::MissingCapability(
                Capability::EditOtherUsers,
            ))
        };
        self.enforce(decision, Capability::EditOtherUsers, &resource)
    }

    /// Fails unless the session may see `target_user_id`. Denial reports
    /// `reported` as the missing capability.
    pub async fn require_visible(
        &self,
        target_user_id: &str,
        reported: Capability,
    ) -> DomainResult<()> {
        let decision = if self
            .oracle
            .can_see_user(self.session, target_user_id)
            .await?
        {
            AuthorizationDecision::allow()
        } else {
            AuthorizationDecision::deny(DeniedReason::NotVisible)
        };
        self.enforce(decision, reported, &Resource::user(target_user_id))
    }

    fn enforce(
        &self,
        decision: AuthorizationDecision,
        capability: Capability,
        resource: &Resource,
    ) -> DomainResult<()> {
        match decision.denied_reason {
            None if decision.allowed => Ok(()),
            reason => {
                warn!(
                    user_id = %self.session.user_id,
                    capability = %capability,
                    resource = %resource,
                    denied_reason = reason.map(DeniedReason::tag).unwrap_or("denied"),
                    "authorization denied"
                );
                Err(DomainError::Forbidden { capability })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::MemoryAuthorizer;

    #[tokio::test]
    async fn test_require_passes_with_grant_and_fails_without() {
        // Arrange
        let authz = MemoryAuthorizer::new();
        authz.grant("alice", Capability::ViewTeam, Resource::team("t1"));
        let session = Session::for_user("alice");
        let gate = AuthorizationGate::new(&authz, &session);

        // Act & Assert
        gate.require(Capability::ViewTeam, &Resource::team("t1"))
            .await
            .unwrap();
        let err = gate
            .require(Capability::ViewTeam, &Resource::team("t2"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Forbidden {
                capability: Capability::ViewTeam
            }
        ));
    }

    #[tokio::test]
    async fn test_user_access_allows_self_without_grants() {
        let authz = MemoryAuthorizer::new();
        let session = Session::for_user("alice");
        let gate = AuthorizationGate::new(&authz, &session);

        gate.require_user_access("alice").await.unwrap();
        let err = gate.require_user_access("bob").await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Forbidden {
                capability: Capability::EditOtherUsers
            }
        ));
    }

    #[tokio::test]
    async fn test_anonymous_session_has_no_self_access() {
        let authz = MemoryAuthorizer::new();
        let session = Session::anonymous();
        let gate = AuthorizationGate::new(&authz, &session);

        assert!(!gate.has_user_access("").await.unwrap());
    }

    #[tokio::test]
    async fn test_require_any_reports_chosen_capability() {
        let authz = MemoryAuthorizer::new();
        let session = Session::for_user("alice");
        let gate = AuthorizationGate::new(&authz, &session);
        let channel = Resource::channel("c1");
        let alternatives = [
            (Capability::ReadPublicChannel, Resource::team("t1")),
            (Capability::ReadChannel, channel.clone()),
        ];

        let err = gate
            .require_any(&alternatives, Capability::ReadChannel, &channel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Forbidden {
                capability: Capability::ReadChannel
            }
        ));

        authz.grant("alice", Capability::ReadPublicChannel, Resource::team("t1"));
        gate.require_any(&alternatives, Capability::ReadChannel, &channel)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_visibility_denial_reports_given_capability() {
        let authz = MemoryAuthorizer::new();
        let session = Session::for_user("alice");
        let gate = AuthorizationGate::new(&authz, &session);

        let err = gate
            .require_visible("bob", Capability::ViewMembers)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Forbidden {
                capability: Capability::ViewMembers
            }
        ));

        authz.allow_visibility("alice", "bob");
        gate.require_visible("bob", Capability::ViewMembers)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_oracle_failure_is_upstream_not_denial() {
        let authz = MemoryAuthorizer::new();
        authz.set_unavailable(true);
        let session = Session::for_user("alice");
        let gate = AuthorizationGate::new(&authz, &session);

        let err = gate
            .require(Capability::ViewTeam, &Resource::team("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_decide_returns_reason() {
        let authz = MemoryAuthorizer::new();
        let session = Session::for_user("alice");
        let gate = AuthorizationGate::new(&authz, &session);

        let decision = gate
            .decide(Capability::ReadLicenseInformation, &Resource::System)
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(
            decision.denied_reason,
            Some(DeniedReason::MissingCapability(
                Capability::ReadLicenseInformation
            ))
        );
    }
}
