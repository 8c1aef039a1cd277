//! Leader/follower batching over a shared window map.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use super::{BatchFetch, LoadError, LoadResult};

/// Largest number of keys sent in a single fetch by default.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

enum Slot<V> {
    /// Registered, waiting for a leader to drain it.
    Queued,
    /// Part of a fetch that has not returned yet.
    InFlight,
    Ready(LoadResult<V>),
}

struct Window<K, V> {
    slots: HashMap<K, Slot<V>>,
    /// Queued keys in first-seen order.
    pending: VecDeque<K>,
    leader_active: bool,
    cancelled: bool,
    dispatched: usize,
}

enum Step<K, V> {
    Done(HashMap<K, LoadResult<V>>),
    Lead,
    Wait(broadcast::Receiver<()>),
}

/// Batches and deduplicates key lookups within one request.
///
/// The first caller that finds queued keys and no active leader becomes the
/// leader. It yields once so sibling fields can register their keys, then
/// drains up to `max_batch_size` queued keys and calls the fetcher once.
/// Every other caller waits for a completion signal and re-checks the
/// window. The window lock is never held across an await.
pub struct BatchLoader<F: BatchFetch> {
    fetcher: F,
    window: Mutex<Window<F::Key, F::Value>>,
    done_tx: broadcast::Sender<()>,
    cancel_tx: watch::Sender<bool>,
    max_batch_size: usize,
}

impl<F: BatchFetch> BatchLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_max_batch_size(fetcher, DEFAULT_MAX_BATCH_SIZE)
    }

    pub fn with_max_batch_size(fetcher: F, max_batch_size: usize) -> Self {
        let (done_tx, _) = broadcast::channel(16);
        let (cancel_tx, _) = watch::channel(false);
        Self {
            fetcher,
            window: Mutex::new(Window {
                slots: HashMap::new(),
                pending: VecDeque::new(),
                leader_active: false,
                cancelled: false,
                dispatched: 0,
            }),
            done_tx,
            cancel_tx,
            max_batch_size: max_batch_size.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Window<F::Key, F::Value>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads a single key.
    pub async fn load(&self, key: F::Key) -> LoadResult<F::Value> {
        self.load_many(std::slice::from_ref(&key))
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| {
                Err(LoadError::Missing {
                    key: format!("{key:?}"),
                })
            })
    }

    /// Loads several keys; `result[i]` is the outcome of `keys[i]`.
    pub async fn load_many(&self, keys: &[F::Key]) -> Vec<LoadResult<F::Value>> {
        if keys.is_empty() {
            return Vec::new();
        }

        loop {
            let step = {
                let mut window = self.lock();
                if window.cancelled {
                    return keys.iter().map(|_| Err(LoadError::Cancelled)).collect();
                }

                for key in keys {
                    if !window.slots.contains_key(key) {
                        window.slots.insert(key.clone(), Slot::Queued);
                        window.pending.push_back(key.clone());
                    }
                }

                let all_ready = keys
                    .iter()
                    .all(|key| matches!(window.slots.get(key), Some(Slot::Ready(_))));
                if all_ready {
                    // Pass one: one outcome per distinct key.
                    let mut outcomes = HashMap::with_capacity(keys.len());
                    for key in keys {
                        if let Some(Slot::Ready(result)) = window.slots.get(key) {
                            outcomes
                                .entry(key.clone())
                                .or_insert_with(|| result.clone());
                        }
                    }
                    Step::Done(outcomes)
                } else if !window.leader_active && !window.pending.is_empty() {
                    window.leader_active = true;
                    Step::Lead
                } else {
                    // Subscribe under the lock so no completion is missed.
                    Step::Wait(self.done_tx.subscribe())
                }
            };

            match step {
                Step::Done(outcomes) => {
                    // Pass two: project onto the caller's key order.
                    return keys
                        .iter()
                        .map(|key| {
                            outcomes.get(key).cloned().unwrap_or_else(|| {
                                Err(LoadError::Missing {
                                    key: format!("{key:?}"),
                                })
                            })
                        })
                        .collect();
                }
                Step::Lead => self.lead().await,
                Step::Wait(mut rx) => {
                    // Lagged or closed both mean "re-check the window".
                    let _ = rx.recv().await;
                }
            }
        }
    }

    async fn lead(&self) {
        let mut guard = LeaderGuard {
            loader: self,
            batch: Vec::new(),
            finished: false,
        };

        tokio::task::yield_now().await;

        {
            let mut window = self.lock();
            if window.cancelled {
                return;
            }
            let take = window.pending.len().min(self.max_batch_size);
            let batch: Vec<F::Key> = window.pending.drain(..take).collect();
            for key in &batch {
                window.slots.insert(key.clone(), Slot::InFlight);
            }
            window.dispatched += 1;
            guard.batch = batch;
        }

        debug!(
            batch_size = guard.batch.len(),
            max_batch_size = self.max_batch_size,
            "dispatching batch fetch"
        );

        if let Some(outcome) = self.fetch_unless_cancelled(&guard.batch).await {
            guard.finish(outcome);
        }
    }

    /// Runs one fetch, abandoning it as soon as the loader is cancelled.
    ///
    /// Returns `None` on cancellation. A cancel issued before the first poll
    /// wins, so the fetcher is never entered after `cancel()`.
    pub(super) async fn fetch_unless_cancelled(
        &self,
        batch: &[F::Key],
    ) -> Option<Result<Vec<LoadResult<F::Value>>, LoadError>> {
        let mut cancel_rx = self.cancel_tx.subscribe();
        tokio::select! {
            biased;
            _ = cancel_rx.wait_for(|cancelled| *cancelled) => None,
            result = self.fetcher.fetch(batch) => Some(result),
        }
    }

    /// Cancels the window. Waiting and future loads resolve to
    /// [`LoadError::Cancelled`]; no further fetch is dispatched.
    pub fn cancel(&self) {
        {
            let mut window = self.lock();
            if window.cancelled {
                return;
            }
            window.cancelled = true;
        }
        self.cancel_tx.send_replace(true);
        let _ = self.done_tx.send(());
        debug!("batch loader cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Number of fetch calls dispatched so far.
    pub fn dispatch_count(&self) -> usize {
        self.lock().dispatched
    }
}

/// Releases leadership on every exit path.
///
/// If the leader is dropped before its fetch returns, the in-flight keys are
/// forgotten so waiting callers re-register them and elect a new leader.
struct LeaderGuard<'a, F: BatchFetch> {
    loader: &'a BatchLoader<F>,
    batch: Vec<F::Key>,
    finished: bool,
}

impl<F: BatchFetch> LeaderGuard<'_, F> {
    fn finish(mut self, outcome: Result<Vec<LoadResult<F::Value>>, LoadError>) {
        let batch = std::mem::take(&mut self.batch);
        let mut window = self.loader.lock();
        match outcome {
            Ok(results) => {
                if results.len() != batch.len() {
                    warn!(
                        expected = batch.len(),
                        returned = results.len(),
                        "batch fetch returned a mismatched result count"
                    );
                }
                let mut results = results.into_iter();
                for key in batch {
                    let result = results.next().unwrap_or_else(|| {
                        Err(LoadError::Missing {
                            key: format!("{key:?}"),
                        })
                    });
                    window.slots.insert(key, Slot::Ready(result));
                }
            }
            Err(err) => {
                warn!(batch_size = batch.len(), error = %err, "batch fetch failed");
                for key in batch {
                    window.slots.insert(key, Slot::Ready(Err(err.clone())));
                }
            }
        }
        self.finished = true;
    }
}

impl<F: BatchFetch> Drop for LeaderGuard<'_, F> {
    fn drop(&mut self) {
        {
            let mut window = self.loader.lock();
            if !self.finished {
                for key in &self.batch {
                    if matches!(window.slots.get(key), Some(Slot::InFlight)) {
                        window.slots.remove(key);
                    }
                }
            }
            window.leader_active = false;
        }
        let _ = self.loader.done_tx.send(());
    }
}
