//! Fields of a channel member.

use fieldgate_domain::{
    AuthorizationOracle, Capability, ChannelMemberCursor, DomainError, DomainResult, LoadError,
    PageCursor, Resource,
};
use fieldgate_storage::{Channel, ChannelMember, ChannelType, DataStore, Role, User};
use tracing::debug;

use super::{RequestScope, Resolver};
use crate::settings::ClientSettingsSource;

/// Cursor positioned after `member` in a channel-member listing.
pub fn member_cursor(member: &ChannelMember) -> String {
    ChannelMemberCursor {
        channel_id: member.channel_id.clone(),
        user_id: member.user_id.clone(),
    }
    .encode()
}

impl<S, A, C> Resolver<S, A, C>
where
    S: DataStore,
    A: AuthorizationOracle,
    C: ClientSettingsSource,
{
    /// The member's user, gated like the `user` field.
    pub async fn member_user(
        &self,
        scope: &RequestScope<S>,
        member: &ChannelMember,
    ) -> DomainResult<User> {
        self.user(scope, &member.user_id).await
    }

    /// The member's channel.
    ///
    /// Open channels are readable with `ReadPublicChannel` on their team or
    /// `ReadChannel` on the channel; other channels need `ReadChannel`.
    pub async fn member_channel(
        &self,
        scope: &RequestScope<S>,
        member: &ChannelMember,
    ) -> DomainResult<Channel> {
        let channel = self.store.get_channel(&member.channel_id).await?;
        let resource = Resource::channel(channel.id.as_str());
        let gate = self.gate(scope);

        if channel.channel_type == ChannelType::Open {
            let alternatives = [
                (
                    Capability::ReadPublicChannel,
                    Resource::team(channel.team_id.as_str()),
                ),
                (Capability::ReadChannel, resource.clone()),
            ];
            gate.require_any(&alternatives, Capability::ReadPublicChannel, &resource)
                .await?;
        } else {
            gate.require(Capability::ReadChannel, &resource).await?;
        }
        Ok(channel)
    }

    /// The member's roles, in the order of its `roles` string.
    ///
    /// Lookups go through the request's roles loader, so sibling members
    /// resolved concurrently share one store call. If any role fails, the
    /// field fails with the first failure. A malformed role name is a
    /// validation error.
    pub async fn member_roles(
        &self,
        scope: &RequestScope<S>,
        member: &ChannelMember,
    ) -> DomainResult<Vec<Role>> {
        let names = member.role_names();
        let total = names.len();
        let results = scope.roles().load_many(&names).await;

        let mut roles = Vec::with_capacity(total);
        let mut first: Option<LoadError> = None;
        let mut failed = 0;
        for result in results {
            match result {
                Ok(role) => roles.push(role),
                Err(err) => {
                    failed += 1;
                    first.get_or_insert(err);
                }
            }
        }

        match first {
            None => Ok(roles),
            Some(LoadError::Cancelled) => Err(DomainError::Cancelled),
            Some(invalid @ LoadError::InvalidKey { .. }) => Err(invalid.into()),
            Some(first) => {
                debug!(
                    channel_id = %member.channel_id,
                    user_id = %member.user_id,
                    failed,
                    total,
                    "role lookup failed"
                );
                Err(DomainError::PartialBatch {
                    failed,
                    total,
                    first: first.to_string(),
                })
            }
        }
    }
}
