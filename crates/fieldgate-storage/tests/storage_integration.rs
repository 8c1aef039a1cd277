//! Storage Integration Tests.
//!
//! These tests exercise the DataStore contract through generic helpers so any
//! backend can be run through the same checks.

use std::sync::Arc;

use fieldgate_storage::{
    Channel, ChannelFilter, ChannelMember, ChannelType, DataStore, MemberKey, MemoryDataStore,
    StorageError,
};

fn seed_channels(store: &MemoryDataStore, user_id: &str, count: usize) {
    for i in 0..count {
        let id = format!("channel-{i:03}");
        store.add_channel(Channel {
            id: id.clone(),
            team_id: "team-1".to_string(),
            channel_type: ChannelType::Open,
            name: id.clone(),
            display_name: format!("Channel {i}"),
            create_at: 1,
            update_at: 1,
            delete_at: 0,
        });
        store.add_channel_member(ChannelMember {
            channel_id: id,
            user_id: user_id.to_string(),
            roles: "channel_user".to_string(),
            msg_count: 0,
            mention_count: 0,
            last_update_at: i as i64,
        });
    }
}

/// Walks every page of a user's channels and returns the visited IDs.
async fn walk_channel_pages<S: DataStore>(store: &S, user_id: &str, page: usize) -> Vec<String> {
    let filter = ChannelFilter {
        user_id: user_id.to_string(),
        ..Default::default()
    };
    let mut seen = Vec::new();
    let mut after: Option<String> = None;
    loop {
        let rows = store
            .list_channels_for_user(&filter, after.as_deref(), page)
            .await
            .unwrap();
        assert!(rows.len() <= page);
        let done = rows.len() < page;
        after = rows.last().map(|c| c.id.clone());
        seen.extend(rows.into_iter().map(|c| c.id));
        if done {
            break;
        }
    }
    seen
}

async fn walk_member_pages<S: DataStore>(store: &S, user_id: &str, page: usize) -> Vec<MemberKey> {
    let mut seen = Vec::new();
    let mut after: Option<MemberKey> = None;
    loop {
        let rows = store
            .list_channel_members_for_user(user_id, after.as_ref(), page, 0)
            .await
            .unwrap();
        let done = rows.len() < page;
        after = rows.last().map(ChannelMember::key);
        seen.extend(rows.iter().map(ChannelMember::key));
        if done {
            break;
        }
    }
    seen
}

#[tokio::test]
async fn test_keyset_walk_visits_every_channel_once() {
    let store = MemoryDataStore::new();
    seed_channels(&store, "alice", 7);

    let ids = walk_channel_pages(&store, "alice", 3).await;

    assert_eq!(ids.len(), 7);
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(ids, sorted, "pages must be ordered without duplicates");
}

#[tokio::test]
async fn test_keyset_walk_visits_every_membership_once() {
    let store = MemoryDataStore::new();
    seed_channels(&store, "alice", 5);
    seed_channels(&store, "bob", 2);

    let keys = walk_member_pages(&store, "alice", 2).await;

    assert_eq!(keys.len(), 5);
    assert!(keys.iter().all(|k| k.user_id == "alice"));
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_last_update_filter_applies_to_memberships() {
    let store = MemoryDataStore::new();
    seed_channels(&store, "alice", 5);

    let rows = store
        .list_channel_members_for_user("alice", None, 10, 3)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|m| m.last_update_at >= 3));
}

#[tokio::test]
async fn test_invalid_ids_are_rejected_as_invalid_input() {
    let store = MemoryDataStore::new();

    let result = store.get_channel("").await;
    assert!(matches!(result, Err(StorageError::InvalidInput { .. })));

    let result = store.list_channel_members_for_user("", None, 10, 0).await;
    assert!(matches!(result, Err(StorageError::InvalidInput { .. })));
}

#[tokio::test]
async fn test_concurrent_reads_share_one_store() {
    let store = Arc::new(MemoryDataStore::new());
    seed_channels(&store, "alice", 20);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { walk_channel_pages(store.as_ref(), "alice", 4).await.len() })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 20);
    }
}
