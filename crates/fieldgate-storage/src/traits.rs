//! DataStore trait definition and the records it serves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Maximum length of any record identifier accepted by the store.
pub const MAX_ID_LENGTH: usize = 64;

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub delete_at: i64,
}

/// Channel visibility class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    #[serde(rename = "O")]
    Open,
    #[serde(rename = "P")]
    Private,
    #[serde(rename = "D")]
    Direct,
    #[serde(rename = "G")]
    Group,
}

/// A channel. Direct and group channels have an empty `team_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub team_id: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub name: String,
    pub display_name: String,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
}

/// Membership of a user in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    pub channel_id: String,
    pub user_id: String,
    /// Space-separated role names.
    pub roles: String,
    pub msg_count: i64,
    pub mention_count: i64,
    pub last_update_at: i64,
}

impl ChannelMember {
    /// Role names in the order they appear in `roles`.
    pub fn role_names(&self) -> Vec<String> {
        self.roles.split_whitespace().map(str::to_string).collect()
    }

    /// Keyset position of this membership in cursor order.
    pub fn key(&self) -> MemberKey {
        MemberKey {
            channel_id: self.channel_id.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

/// Membership of a user in a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub team_id: String,
    pub user_id: String,
    pub roles: String,
    pub delete_at: i64,
}

/// A named role and the permissions it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub permissions: Vec<String>,
    pub scheme_managed: bool,
}

/// A record of a user leaving a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLeave {
    pub channel_id: String,
    pub user_id: String,
    pub leave_time: i64,
}

/// A reaction usage row for the insights queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopReaction {
    pub emoji_name: String,
    pub count: i64,
}

/// A channel activity row for the insights queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopChannel {
    pub id: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub display_name: String,
    pub name: String,
    pub message_count: i64,
}

/// Keyset position within the channel-member ordering `(channel_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberKey {
    pub channel_id: String,
    pub user_id: String,
}

/// Filter for listing a user's channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    /// Member whose channels are listed.
    pub user_id: String,
    /// Restrict to one team. Direct and group channels are always included.
    pub team_id: Option<String>,
    /// Include archived channels.
    pub include_deleted: bool,
    /// With `include_deleted`, only archived channels deleted at or after this time.
    pub last_delete_at: i64,
    /// Only channels updated at or after this time.
    pub last_update_at: i64,
}

/// Window and page for the insights queries.
#[derive(Debug, Clone)]
pub struct InsightsQuery {
    pub team_id: String,
    pub since_unix_milli: i64,
    pub offset: usize,
    /// Zero means no limit.
    pub limit: usize,
}

impl InsightsQuery {
    /// Rows to take after `offset`.
    pub fn row_limit(&self) -> usize {
        if self.limit == 0 {
            usize::MAX
        } else {
            self.limit
        }
    }
}

/// Abstract read interface consumed by the resolution layer.
///
/// Implementations must be thread-safe (Send + Sync). List methods return
/// rows in cursor order and never more than `limit` rows.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    /// Gets a user by ID.
    async fn get_user(&self, id: &str) -> StorageResult<User>;

    /// Gets a channel by ID.
    async fn get_channel(&self, id: &str) -> StorageResult<Channel>;

    /// Gets one channel membership.
    async fn get_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> StorageResult<ChannelMember>;

    /// Lists the channels a user belongs to, ordered by channel ID,
    /// strictly after `after_channel` when given.
    async fn list_channels_for_user(
        &self,
        filter: &ChannelFilter,
        after_channel: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<Channel>>;

    /// Lists a user's channel memberships ordered by `(channel_id, user_id)`,
    /// strictly after `after` when given.
    async fn list_channel_members_for_user(
        &self,
        user_id: &str,
        after: Option<&MemberKey>,
        limit: usize,
        last_update_at: i64,
    ) -> StorageResult<Vec<ChannelMember>>;

    /// Gets one team membership.
    async fn get_team_member(&self, team_id: &str, user_id: &str) -> StorageResult<TeamMember>;

    /// Lists the active team memberships of a user.
    async fn list_team_members_for_user(&self, user_id: &str) -> StorageResult<Vec<TeamMember>>;

    /// Looks up roles by name.
    ///
    /// Unknown names are skipped and the output order is unspecified;
    /// callers must re-align results to their own key order.
    async fn get_roles_by_names(&self, names: &[String]) -> StorageResult<Vec<Role>>;

    /// IDs of the channels a user left at or after `since`.
    async fn channels_left_since(&self, user_id: &str, since: i64) -> StorageResult<Vec<String>>;

    /// Most used reactions in a team, highest count first.
    async fn top_reactions_for_team(&self, query: &InsightsQuery)
        -> StorageResult<Vec<TopReaction>>;

    /// Most active open channels in a team, highest message count first.
    async fn top_channels_for_team(&self, query: &InsightsQuery) -> StorageResult<Vec<TopChannel>>;
}

/// Validates a record identifier.
pub fn validate_id(kind: &str, id: &str) -> StorageResult<()> {
    if id.is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("{kind} cannot be empty"),
        });
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!("{kind} exceeds maximum length of {MAX_ID_LENGTH} characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_splits_on_whitespace() {
        let member = ChannelMember {
            channel_id: "c1".to_string(),
            user_id: "u1".to_string(),
            roles: " channel_user  channel_admin ".to_string(),
            msg_count: 0,
            mention_count: 0,
            last_update_at: 0,
        };

        assert_eq!(member.role_names(), vec!["channel_user", "channel_admin"]);
    }

    #[test]
    fn test_member_keys_order_by_channel_then_user() {
        let a = MemberKey {
            channel_id: "a".to_string(),
            user_id: "z".to_string(),
        };
        let b = MemberKey {
            channel_id: "b".to_string(),
            user_id: "a".to_string(),
        };
        assert!(a < b);
    }

    #[test]
    fn test_validate_id_rejects_empty_and_oversized() {
        assert!(validate_id("user_id", "u1").is_ok());
        assert!(matches!(
            validate_id("user_id", ""),
            Err(StorageError::InvalidInput { .. })
        ));
        let long = "x".repeat(MAX_ID_LENGTH + 1);
        assert!(matches!(
            validate_id("user_id", &long),
            Err(StorageError::InvalidInput { .. })
        ));
    }
}
