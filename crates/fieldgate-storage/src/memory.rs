//! In-memory storage implementation for testing and embedding.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::instrument;

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    validate_id, Channel, ChannelFilter, ChannelLeave, ChannelMember, ChannelType, DataStore,
    InsightsQuery, MemberKey, Role, TeamMember, TopChannel, TopReaction, User,
};

/// A reaction placed on a post, kept for the insights queries.
#[derive(Debug, Clone)]
struct ReactionEvent {
    emoji_name: String,
    create_at: i64,
}

/// A post created in a channel, kept for the insights queries.
#[derive(Debug, Clone)]
struct PostEvent {
    channel_id: String,
    create_at: i64,
}

/// In-memory implementation of DataStore.
///
/// # Performance Characteristics
///
/// - **Point lookups**: O(1) average (DashMap)
/// - **List queries**: O(N log N) over the rows of the store (scan, filter, sort)
///
/// Uses DashMap for thread-safe concurrent access without a global lock.
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    users: DashMap<String, User>,
    channels: DashMap<String, Channel>,
    channel_members: DashMap<MemberKey, ChannelMember>,
    /// Keyed by `(team_id, user_id)`.
    team_members: DashMap<(String, String), TeamMember>,
    roles: DashMap<String, Role>,
    /// Membership history keyed by user.
    leaves: DashMap<String, Vec<ChannelLeave>>,
    /// Reaction events keyed by team.
    reactions: DashMap<String, Vec<ReactionEvent>>,
    /// Post events keyed by team.
    posts: DashMap<String, Vec<PostEvent>>,
}

impl MemoryDataStore {
    /// Creates a new in-memory data store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory data store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn add_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn add_channel(&self, channel: Channel) {
        self.channels.insert(channel.id.clone(), channel);
    }

    pub fn add_channel_member(&self, member: ChannelMember) {
        self.channel_members.insert(member.key(), member);
    }

    /// Removes a channel membership and records the leave in the history.
    pub fn remove_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
        leave_time: i64,
    ) -> StorageResult<()> {
        let key = MemberKey {
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
        };
        if self.channel_members.remove(&key).is_none() {
            return Err(StorageError::not_found(
                "channel member",
                format!("{channel_id}/{user_id}"),
            ));
        }
        self.leaves
            .entry(user_id.to_string())
            .or_default()
            .push(ChannelLeave {
                channel_id: channel_id.to_string(),
                user_id: user_id.to_string(),
                leave_time,
            });
        Ok(())
    }

    pub fn add_team_member(&self, member: TeamMember) {
        self.team_members
            .insert((member.team_id.clone(), member.user_id.clone()), member);
    }

    pub fn add_role(&self, role: Role) {
        self.roles.insert(role.name.clone(), role);
    }

    pub fn record_reaction(&self, team_id: &str, emoji_name: &str, create_at: i64) {
        self.reactions
            .entry(team_id.to_string())
            .or_default()
            .push(ReactionEvent {
                emoji_name: emoji_name.to_string(),
                create_at,
            });
    }

    pub fn record_post(&self, team_id: &str, channel_id: &str, create_at: i64) {
        self.posts
            .entry(team_id.to_string())
            .or_default()
            .push(PostEvent {
                channel_id: channel_id.to_string(),
                create_at,
            });
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn get_user(&self, id: &str) -> StorageResult<User> {
        validate_id("user_id", id)?;
        self.users
            .get(id)
            .map(|u| u.value().clone())
            .ok_or_else(|| StorageError::not_found("user", id))
    }

    async fn get_channel(&self, id: &str) -> StorageResult<Channel> {
        validate_id("channel_id", id)?;
        self.channels
            .get(id)
            .map(|c| c.value().clone())
            .ok_or_else(|| StorageError::not_found("channel", id))
    }

    async fn get_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> StorageResult<ChannelMember> {
        validate_id("channel_id", channel_id)?;
        validate_id("user_id", user_id)?;
        let key = MemberKey {
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
        };
        self.channel_members
            .get(&key)
            .map(|m| m.value().clone())
            .ok_or_else(|| {
                StorageError::not_found("channel member", format!("{channel_id}/{user_id}"))
            })
    }

    #[instrument(skip(self, filter), fields(user_id = %filter.user_id))]
    async fn list_channels_for_user(
        &self,
        filter: &ChannelFilter,
        after_channel: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<Channel>> {
        validate_id("user_id", &filter.user_id)?;

        let channel_ids: Vec<String> = self
            .channel_members
            .iter()
            .filter(|m| m.user_id == filter.user_id)
            .map(|m| m.channel_id.clone())
            .collect();

        let team = filter.team_id.as_deref().filter(|t| !t.is_empty());
        let mut channels: Vec<Channel> = channel_ids
            .iter()
            .filter_map(|id| self.channels.get(id).map(|c| c.value().clone()))
            .filter(|c| match team {
                Some(team_id) => c.team_id == team_id || c.team_id.is_empty(),
                None => true,
            })
            .filter(|c| {
                if c.delete_at == 0 {
                    return true;
                }
                filter.include_deleted && c.delete_at >= filter.last_delete_at
            })
            .filter(|c| c.update_at >= filter.last_update_at)
            .filter(|c| after_channel.map_or(true, |after| c.id.as_str() > after))
            .collect();

        channels.sort_by(|a, b| a.id.cmp(&b.id));
        channels.truncate(limit);
        Ok(channels)
    }

    #[instrument(skip(self, after))]
    async fn list_channel_members_for_user(
        &self,
        user_id: &str,
        after: Option<&MemberKey>,
        limit: usize,
        last_update_at: i64,
    ) -> StorageResult<Vec<ChannelMember>> {
        validate_id("user_id", user_id)?;

        let mut members: Vec<ChannelMember> = self
            .channel_members
            .iter()
            .filter(|m| m.user_id == user_id && m.last_update_at >= last_update_at)
            .filter(|m| after.map_or(true, |after| m.key() > after))
            .map(|m| m.value().clone())
            .collect();

        members.sort_by(|a, b| {
            a.channel_id
                .cmp(&b.channel_id)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        members.truncate(limit);
        Ok(members)
    }

    async fn get_team_member(&self, team_id: &str, user_id: &str) -> StorageResult<TeamMember> {
        validate_id("team_id", team_id)?;
        validate_id("user_id", user_id)?;
        self.team_members
            .get(&(team_id.to_string(), user_id.to_string()))
            .filter(|m| m.delete_at == 0)
            .map(|m| m.value().clone())
            .ok_or_else(|| StorageError::not_found("team member", format!("{team_id}/{user_id}")))
    }

    async fn list_team_members_for_user(&self, user_id: &str) -> StorageResult<Vec<TeamMember>> {
        validate_id("user_id", user_id)?;
        let mut members: Vec<TeamMember> = self
            .team_members
            .iter()
            .filter(|m| m.user_id == user_id && m.delete_at == 0)
            .map(|m| m.value().clone())
            .collect();
        members.sort_by(|a, b| a.team_id.cmp(&b.team_id));
        Ok(members)
    }

    #[instrument(skip(self, names), fields(count = names.len()))]
    async fn get_roles_by_names(&self, names: &[String]) -> StorageResult<Vec<Role>> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        // Map iteration order; callers realign.
        Ok(self
            .roles
            .iter()
            .filter(|r| wanted.contains(r.key().as_str()))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn channels_left_since(&self, user_id: &str, since: i64) -> StorageResult<Vec<String>> {
        validate_id("user_id", user_id)?;
        let mut left: Vec<String> = self
            .leaves
            .get(user_id)
            .map(|history| {
                history
                    .iter()
                    .filter(|l| l.leave_time >= since)
                    .map(|l| l.channel_id.clone())
                    .collect()
            })
            .unwrap_or_default();
        left.sort();
        left.dedup();
        Ok(left)
    }

    #[instrument(skip(self, query), fields(team_id = %query.team_id))]
    async fn top_reactions_for_team(
        &self,
        query: &InsightsQuery,
    ) -> StorageResult<Vec<TopReaction>> {
        validate_id("team_id", &query.team_id)?;

        let mut counts: HashMap<String, i64> = HashMap::new();
        if let Some(events) = self.reactions.get(&query.team_id) {
            for event in events.iter().filter(|e| e.create_at >= query.since_unix_milli) {
                *counts.entry(event.emoji_name.clone()).or_default() += 1;
            }
        }

        let mut rows: Vec<TopReaction> = counts
            .into_iter()
            .map(|(emoji_name, count)| TopReaction { emoji_name, count })
            .collect();
        rows.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.emoji_name.cmp(&b.emoji_name))
        });

        Ok(rows
            .into_iter()
            .skip(query.offset)
            .take(query.row_limit())
            .collect())
    }

    #[instrument(skip(self, query), fields(team_id = %query.team_id))]
    async fn top_channels_for_team(&self, query: &InsightsQuery) -> StorageResult<Vec<TopChannel>> {
        validate_id("team_id", &query.team_id)?;

        let mut counts: HashMap<String, i64> = HashMap::new();
        if let Some(events) = self.posts.get(&query.team_id) {
            for event in events.iter().filter(|e| e.create_at >= query.since_unix_milli) {
                *counts.entry(event.channel_id.clone()).or_default() += 1;
            }
        }

        let mut rows: Vec<TopChannel> = counts
            .into_iter()
            .filter_map(|(channel_id, message_count)| {
                let channel = self.channels.get(&channel_id)?;
                if channel.channel_type != ChannelType::Open || channel.delete_at != 0 {
                    return None;
                }
                Some(TopChannel {
                    id: channel.id.clone(),
                    channel_type: channel.channel_type,
                    display_name: channel.display_name.clone(),
                    name: channel.name.clone(),
                    message_count,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.message_count
                .cmp(&a.message_count)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(rows
            .into_iter()
            .skip(query.offset)
            .take(query.row_limit())
            .collect())
    }
}
