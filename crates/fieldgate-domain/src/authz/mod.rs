//! Capabilities, resources and the authorization gate.
//!
//! Every field resolver asks the gate before touching the data store. The
//! gate itself holds no state: each decision goes to the
//! [`AuthorizationOracle`] and is never cached.

mod gate;
mod memory;

pub use gate::AuthorizationGate;
pub use memory::MemoryAuthorizer;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainResult;

/// Identifier clients may pass instead of their own user ID.
pub const ME: &str = "me";

/// A named permission checked against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    EditOtherUsers,
    ViewTeam,
    ReadChannel,
    ReadPublicChannel,
    ReadOtherUsersTeams,
    ViewMembers,
    ReadLicenseInformation,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::EditOtherUsers => "edit_other_users",
            Capability::ViewTeam => "view_team",
            Capability::ReadChannel => "read_channel",
            Capability::ReadPublicChannel => "read_public_channel",
            Capability::ReadOtherUsersTeams => "read_other_users_teams",
            Capability::ViewMembers => "view_members",
            Capability::ReadLicenseInformation => "read_license_information",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The object a capability is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    System,
    User(String),
    Team(String),
    Channel(String),
}

impl Resource {
    pub fn user(id: impl Into<String>) -> Self {
        Resource::User(id.into())
    }

    pub fn team(id: impl Into<String>) -> Self {
        Resource::Team(id.into())
    }

    pub fn channel(id: impl Into<String>) -> Self {
        Resource::Channel(id.into())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::System => f.write_str("system"),
            Resource::User(id) => write!(f, "user:{id}"),
            Resource::Team(id) => write!(f, "team:{id}"),
            Resource::Channel(id) => write!(f, "channel:{id}"),
        }
    }
}

/// The caller of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Empty for anonymous sessions.
    pub user_id: String,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_empty()
    }
}

/// Replaces the `"me"` sentinel with the session's user ID.
pub fn resolve_subject_id<'a>(session: &'a Session, id: &'a str) -> &'a str {
    if id == ME {
        &session.user_id
    } else {
        id
    }
}

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "denied_reason", content = "capability")]
pub enum DeniedReason {
    MissingCapability(Capability),
    NotVisible,
}

impl DeniedReason {
    /// Short tag written to logs.
    pub fn tag(self) -> &'static str {
        match self {
            DeniedReason::MissingCapability(_) => "missing_capability",
            DeniedReason::NotVisible => "not_visible",
        }
    }
}

/// Outcome of a single authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub denied_reason: Option<DeniedReason>,
}

impl AuthorizationDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            denied_reason: None,
        }
    }

    pub fn deny(reason: DeniedReason) -> Self {
        Self {
            allowed: false,
            denied_reason: Some(reason),
        }
    }
}

/// Source of truth for capability grants and user visibility.
///
/// Implementations report their own failures as `DomainError::Upstream`;
/// the gate never turns an oracle failure into an allow.
#[async_trait]
pub trait AuthorizationOracle: Send + Sync {
    /// Whether `session` holds `capability` on `resource`.
    async fn has_capability(
        &self,
        session: &Session,
        capability: Capability,
        resource: &Resource,
    ) -> DomainResult<bool>;

    /// Whether `viewer` may see the profile of `target_user_id`.
    async fn can_see_user(&self, viewer: &Session, target_user_id: &str) -> DomainResult<bool>;
}
