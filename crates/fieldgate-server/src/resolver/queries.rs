//! Top-level query fields.

use fieldgate_domain::{
    resolve_subject_id, AuthorizationOracle, Capability, ChannelCursor, ChannelMemberCursor,
    DomainResult, Page, PageRequest, Resource,
};
use fieldgate_storage::{Channel, ChannelFilter, ChannelMember, DataStore, MemberKey, TeamMember, User};
use tracing::instrument;

use super::member::member_cursor;
use super::{RequestScope, Resolver};
use crate::settings::{ClientSettingsSource, StringMap};

/// Arguments of the `channels` field.
#[derive(Debug, Clone, Default)]
pub struct ChannelsArgs {
    /// User whose channels are listed; `"me"` for the caller.
    pub user_id: String,
    pub team_id: Option<String>,
    pub include_deleted: bool,
    pub last_delete_at: i64,
    pub last_update_at: i64,
    pub page: PageRequest,
}

/// Arguments of the `channelMembers` field.
#[derive(Debug, Clone, Default)]
pub struct ChannelMembersArgs {
    pub user_id: String,
    /// Restricts the result to one membership.
    pub channel_id: Option<String>,
    pub page: PageRequest,
    pub last_update_at: i64,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl<S, A, C> Resolver<S, A, C>
where
    S: DataStore,
    A: AuthorizationOracle,
    C: ClientSettingsSource,
{
    /// One page of the channels a user belongs to.
    #[instrument(skip(self, scope, args), fields(user_id = %args.user_id))]
    pub async fn channels(
        &self,
        scope: &RequestScope<S>,
        args: &ChannelsArgs,
    ) -> DomainResult<Page<Channel>> {
        let user_id = resolve_subject_id(scope.session(), &args.user_id);
        let team_id = non_empty(&args.team_id);

        let gate = self.gate(scope);
        gate.require_user_access(user_id).await?;
        if let Some(team_id) = team_id {
            gate.require(Capability::ViewTeam, &Resource::team(team_id))
                .await?;
        }

        let page = args.page.validate::<ChannelCursor>(&self.limits)?;
        let filter = ChannelFilter {
            user_id: user_id.to_string(),
            team_id: team_id.map(str::to_string),
            include_deleted: args.include_deleted,
            last_delete_at: args.last_delete_at,
            last_update_at: args.last_update_at,
        };
        let after = page.after.as_ref().map(|c| c.channel_id.as_str());
        let rows = self
            .store
            .list_channels_for_user(&filter, after, page.fetch_limit())
            .await?;

        Ok(Page::from_lookahead(rows, page.limit, |c: &Channel| {
            ChannelCursor {
                channel_id: c.id.clone(),
            }
        }))
    }

    /// One membership when `channel_id` is given, else one page of the
    /// user's memberships.
    #[instrument(skip(self, scope, args), fields(user_id = %args.user_id))]
    pub async fn channel_members(
        &self,
        scope: &RequestScope<S>,
        args: &ChannelMembersArgs,
    ) -> DomainResult<Page<ChannelMember>> {
        let user_id = resolve_subject_id(scope.session(), &args.user_id);
        let gate = self.gate(scope);

        if let Some(channel_id) = non_empty(&args.channel_id) {
            gate.require(Capability::ReadChannel, &Resource::channel(channel_id))
                .await?;
            let member = self.store.get_channel_member(channel_id, user_id).await?;
            let end_cursor = Some(member_cursor(&member));
            return Ok(Page {
                items: vec![member],
                has_next: false,
                end_cursor,
            });
        }

        gate.require_user_access(user_id).await?;

        let page = args.page.validate::<ChannelMemberCursor>(&self.limits)?;
        let after = page.after.as_ref().map(|c| MemberKey {
            channel_id: c.channel_id.clone(),
            user_id: c.user_id.clone(),
        });
        let rows = self
            .store
            .list_channel_members_for_user(
                user_id,
                after.as_ref(),
                page.fetch_limit(),
                args.last_update_at,
            )
            .await?;

        Ok(Page::from_lookahead(rows, page.limit, |m: &ChannelMember| {
            ChannelMemberCursor {
                channel_id: m.channel_id.clone(),
                user_id: m.user_id.clone(),
            }
        }))
    }

    /// Team memberships of a user, or the single membership in `team_id`.
    #[instrument(skip(self, scope))]
    pub async fn team_members(
        &self,
        scope: &RequestScope<S>,
        user_id: &str,
        team_id: Option<&str>,
    ) -> DomainResult<Vec<TeamMember>> {
        let user_id = resolve_subject_id(scope.session(), user_id);
        let gate = self.gate(scope);

        if !gate.has_user_access(user_id).await? {
            gate.require(Capability::ReadOtherUsersTeams, &Resource::System)
                .await?;
        }
        gate.require_visible(user_id, Capability::ViewMembers)
            .await?;

        match team_id.filter(|t| !t.is_empty()) {
            Some(team_id) => {
                gate.require(Capability::ViewTeam, &Resource::team(team_id))
                    .await?;
                Ok(vec![self.store.get_team_member(team_id, user_id).await?])
            }
            None => Ok(self.store.list_team_members_for_user(user_id).await?),
        }
    }

    /// IDs of the channels a user left at or after `since`.
    #[instrument(skip(self, scope))]
    pub async fn channels_left(
        &self,
        scope: &RequestScope<S>,
        user_id: &str,
        since: i64,
    ) -> DomainResult<Vec<String>> {
        let user_id = resolve_subject_id(scope.session(), user_id);
        self.gate(scope).require_user_access(user_id).await?;
        Ok(self.store.channels_left_since(user_id, since).await?)
    }

    /// A user profile, if the caller may see it.
    #[instrument(skip(self, scope))]
    pub async fn user(&self, scope: &RequestScope<S>, id: &str) -> DomainResult<User> {
        let session = scope.session();
        let id = resolve_subject_id(session, id);
        if session.is_anonymous() || session.user_id != id {
            self.gate(scope)
                .require_visible(id, Capability::ViewMembers)
                .await?;
        }
        Ok(self.store.get_user(id).await?)
    }

    /// Client configuration; anonymous sessions get the limited view.
    pub async fn config(&self, scope: &RequestScope<S>) -> DomainResult<StringMap> {
        if scope.session().is_anonymous() {
            self.settings.limited_config().await
        } else {
            self.settings.full_config().await
        }
    }

    /// Full license for sessions allowed to read it, else the sanitized one.
    pub async fn license(&self, scope: &RequestScope<S>) -> DomainResult<StringMap> {
        let decision = self
            .gate(scope)
            .decide(Capability::ReadLicenseInformation, &Resource::System)
            .await?;
        if decision.allowed {
            self.settings.license().await
        } else {
            self.settings.sanitized_license().await
        }
    }
}

