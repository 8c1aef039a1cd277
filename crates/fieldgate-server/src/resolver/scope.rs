//! Per-request state passed explicitly to every resolver.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fieldgate_domain::{BatchLoader, DomainError, DomainResult, Session};
use fieldgate_storage::DataStore;
use tracing::warn;

use super::roles::RoleFetcher;

/// Session, deadline and live loaders of one request.
///
/// Created by [`Resolver::new_scope`](super::Resolver::new_scope) and
/// dropped when the response is assembled. Loader outcomes never outlive
/// the scope.
pub struct RequestScope<S: DataStore> {
    session: Session,
    roles: BatchLoader<RoleFetcher<S>>,
    timeout: Duration,
}

impl<S: DataStore> RequestScope<S> {
    pub fn new(session: Session, store: Arc<S>, max_batch_size: usize, timeout: Duration) -> Self {
        Self {
            session,
            roles: BatchLoader::with_max_batch_size(RoleFetcher::new(store), max_batch_size),
            timeout,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Loader for role lookups by name.
    pub fn roles(&self) -> &BatchLoader<RoleFetcher<S>> {
        &self.roles
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `fut` under the request deadline.
    ///
    /// On expiry the loaders are cancelled, so sibling fields still waiting
    /// on a batch wake up with a cancellation error.
    pub async fn run<T, F>(&self, fut: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let duration_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    user_id = %self.session.user_id,
                    duration_ms,
                    "request deadline exceeded"
                );
                self.cancel();
                Err(DomainError::Timeout { duration_ms })
            }
        }
    }

    /// Cancels outstanding and future loads of this request.
    pub fn cancel(&self) {
        self.roles.cancel();
    }
}
