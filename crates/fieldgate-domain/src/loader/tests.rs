//! Tests for BatchLoader.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use super::*;

/// Doubles numeric keys and records every batch it sees.
#[derive(Default)]
struct RecordingFetcher {
    batches: Mutex<Vec<Vec<String>>>,
    /// Values returned for keys; keys not listed get `NotFound`.
    values: HashMap<String, i64>,
    /// Number of results to drop from the tail of each batch.
    truncate_by: usize,
    /// Fail the first N calls as a whole.
    fail_calls: usize,
    /// Never return from the first N calls.
    hang_calls: usize,
    calls: AtomicUsize,
}

impl RecordingFetcher {
    fn with_values(keys: &[&str]) -> Self {
        Self {
            values: keys
                .iter()
                .enumerate()
                .map(|(i, k)| (k.to_string(), i as i64))
                .collect(),
            ..Default::default()
        }
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchFetch for Arc<RecordingFetcher> {
    type Key = String;
    type Value = i64;

    async fn fetch(&self, keys: &[String]) -> Result<Vec<LoadResult<i64>>, LoadError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(keys.to_vec());

        if call < self.hang_calls {
            futures::future::pending::<()>().await;
        }
        if call < self.fail_calls {
            return Err(LoadError::Fetch {
                message: "store unavailable".to_string(),
            });
        }

        let mut results: Vec<LoadResult<i64>> = keys
            .iter()
            .map(|k| {
                self.values.get(k).copied().ok_or_else(|| LoadError::NotFound {
                    entity: "value".to_string(),
                    key: k.clone(),
                })
            })
            .collect();
        results.truncate(results.len().saturating_sub(self.truncate_by));
        Ok(results)
    }
}

fn keys(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|k| k.to_string()).collect()
}

#[tokio::test]
async fn test_load_many_deduplicates_and_aligns_results() {
    // Arrange
    let fetcher = Arc::new(RecordingFetcher::with_values(&["a", "b"]));
    let loader = BatchLoader::new(Arc::clone(&fetcher));

    // Act
    let results = loader.load_many(&keys(&["b", "a", "b"])).await;

    // Assert
    assert_eq!(results, vec![Ok(1), Ok(0), Ok(1)]);
    assert_eq!(fetcher.batches(), vec![keys(&["b", "a"])]);
    assert_eq!(loader.dispatch_count(), 1);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch() {
    let fetcher = Arc::new(RecordingFetcher::with_values(&["a", "b", "c"]));
    let loader = BatchLoader::new(Arc::clone(&fetcher));

    let requests = ["a", "b", "a", "c", "b", "a"];
    let results = join_all(requests.iter().map(|k| loader.load(k.to_string()))).await;

    assert_eq!(
        results,
        vec![Ok(0), Ok(1), Ok(0), Ok(2), Ok(1), Ok(0)],
        "each caller gets the value of its own key"
    );
    assert_eq!(fetcher.batches(), vec![keys(&["a", "b", "c"])]);
}

#[tokio::test]
async fn test_resolved_keys_are_served_without_new_fetch() {
    let fetcher = Arc::new(RecordingFetcher::with_values(&["a", "b"]));
    let loader = BatchLoader::new(Arc::clone(&fetcher));

    loader.load_many(&keys(&["a", "b"])).await;
    let again = loader.load("a".to_string()).await;

    assert_eq!(again, Ok(0));
    assert_eq!(loader.dispatch_count(), 1);
}

#[tokio::test]
async fn test_per_key_errors_do_not_fail_siblings() {
    let fetcher = Arc::new(RecordingFetcher::with_values(&["a"]));
    let loader = BatchLoader::new(Arc::clone(&fetcher));

    let results = loader.load_many(&keys(&["a", "ghost"])).await;

    assert_eq!(results[0], Ok(0));
    assert_eq!(
        results[1],
        Err(LoadError::NotFound {
            entity: "value".to_string(),
            key: "ghost".to_string()
        })
    );
}

#[tokio::test]
async fn test_short_result_marks_tail_keys_missing() {
    let fetcher = Arc::new(RecordingFetcher {
        truncate_by: 1,
        ..RecordingFetcher::with_values(&["a", "b", "c"])
    });
    let loader = BatchLoader::new(Arc::clone(&fetcher));

    let results = loader.load_many(&keys(&["a", "b", "c"])).await;

    assert_eq!(results[0], Ok(0));
    assert_eq!(results[1], Ok(1));
    assert!(matches!(results[2], Err(LoadError::Missing { .. })));
}

#[tokio::test]
async fn test_whole_batch_error_only_affects_that_batch() {
    let fetcher = Arc::new(RecordingFetcher {
        fail_calls: 1,
        ..RecordingFetcher::with_values(&["a", "b", "c"])
    });
    let loader = BatchLoader::new(Arc::clone(&fetcher));

    let first = loader.load_many(&keys(&["a", "b"])).await;
    let second = loader.load("c".to_string()).await;

    assert!(first
        .iter()
        .all(|r| matches!(r, Err(LoadError::Fetch { .. }))));
    assert_eq!(second, Ok(2));
    assert_eq!(loader.dispatch_count(), 2);
}

#[tokio::test]
async fn test_oversized_window_is_split_into_sequential_fetches() {
    let all = ["a", "b", "c", "d", "e"];
    let fetcher = Arc::new(RecordingFetcher::with_values(&all));
    let loader = BatchLoader::with_max_batch_size(Arc::clone(&fetcher), 2);

    let results = loader.load_many(&keys(&all)).await;

    assert_eq!(results, vec![Ok(0), Ok(1), Ok(2), Ok(3), Ok(4)]);
    assert_eq!(
        fetcher.batches(),
        vec![keys(&["a", "b"]), keys(&["c", "d"]), keys(&["e"])]
    );
}

#[tokio::test]
async fn test_cancelled_loader_never_fetches() {
    let fetcher = Arc::new(RecordingFetcher::with_values(&["a"]));
    let loader = BatchLoader::new(Arc::clone(&fetcher));

    loader.cancel();
    let result = loader.load("a".to_string()).await;

    assert_eq!(result, Err(LoadError::Cancelled));
    assert!(loader.is_cancelled());
    assert_eq!(loader.dispatch_count(), 0);
    assert!(fetcher.batches().is_empty());
}

#[tokio::test]
async fn test_cancel_before_first_poll_skips_fetch() {
    let fetcher = Arc::new(RecordingFetcher::with_values(&["a"]));
    let loader = BatchLoader::new(Arc::clone(&fetcher));

    loader.cancel();
    // Repeated so an unordered select would eventually poll the fetch.
    for _ in 0..64 {
        assert!(loader.fetch_unless_cancelled(&keys(&["a"])).await.is_none());
    }

    assert!(fetcher.batches().is_empty());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_wakes_waiters_during_fetch() {
    let fetcher = Arc::new(RecordingFetcher {
        hang_calls: usize::MAX,
        ..RecordingFetcher::with_values(&["a"])
    });
    let loader = Arc::new(BatchLoader::new(Arc::clone(&fetcher)));

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load("a".to_string()).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(20)).await;
    loader.cancel();

    for waiter in waiters {
        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke after cancel")
            .unwrap();
        assert_eq!(result, Err(LoadError::Cancelled));
    }
    assert_eq!(loader.dispatch_count(), 1);
}

#[tokio::test]
async fn test_follower_takes_over_when_leader_is_dropped() {
    // Arrange: the first fetch never returns.
    let fetcher = Arc::new(RecordingFetcher {
        hang_calls: 1,
        ..RecordingFetcher::with_values(&["a"])
    });
    let loader = Arc::new(BatchLoader::new(Arc::clone(&fetcher)));

    let leader = {
        let loader = Arc::clone(&loader);
        tokio::spawn(async move { loader.load("a".to_string()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let follower = {
        let loader = Arc::clone(&loader);
        tokio::spawn(async move { loader.load("a".to_string()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Act
    leader.abort();
    let _ = leader.await;
    let result = tokio::time::timeout(Duration::from_secs(1), follower)
        .await
        .expect("follower finished")
        .unwrap();

    // Assert
    assert_eq!(result, Ok(0));
    assert_eq!(loader.dispatch_count(), 2);
}

#[test]
fn test_load_errors_map_to_domain_errors() {
    let err: DomainError = LoadError::NotFound {
        entity: "role".to_string(),
        key: "ghost".to_string(),
    }
    .into();
    assert!(matches!(err, DomainError::NotFound { ref id, .. } if id == "ghost"));

    let err: DomainError = LoadError::Cancelled.into();
    assert!(matches!(err, DomainError::Cancelled));

    let err: DomainError = LoadError::Fetch {
        message: "boom".to_string(),
    }
    .into();
    assert!(matches!(err, DomainError::Upstream { .. }));

    let err: DomainError = LoadError::InvalidKey {
        entity: "role name".to_string(),
        key: "Bad-Name".to_string(),
    }
    .into();
    assert!(matches!(err, DomainError::Validation { ref message } if message.contains("Bad-Name")));
}
