//! Field resolvers.
//!
//! Each resolver takes the [`RequestScope`] explicitly, runs the
//! authorization gate first and only then touches the data store. List
//! fields go through the cursor codec; the `roles` field of a channel member
//! goes through the request's batching loader.

mod insights;
mod member;
mod queries;
mod roles;
mod scope;

pub use insights::InsightsArgs;
pub use member::member_cursor;
pub use queries::{ChannelMembersArgs, ChannelsArgs};
pub use roles::{is_valid_role_name, RoleFetcher, MAX_ROLE_NAME_LENGTH};
pub use scope::RequestScope;

use std::sync::Arc;

use fieldgate_domain::{AuthorizationGate, AuthorizationOracle, PageLimits, Session};
use fieldgate_storage::DataStore;

use crate::config::ServerConfig;
use crate::settings::ClientSettingsSource;

/// Resolves query fields against a data store, an authorization oracle and
/// a client settings source.
///
/// The resolver itself is shared across requests; everything request
/// specific lives in the [`RequestScope`].
pub struct Resolver<S, A, C> {
    store: Arc<S>,
    authz: Arc<A>,
    settings: Arc<C>,
    limits: PageLimits,
    max_batch_size: usize,
    config: ServerConfig,
}

impl<S, A, C> Resolver<S, A, C>
where
    S: DataStore,
    A: AuthorizationOracle,
    C: ClientSettingsSource,
{
    pub fn new(store: Arc<S>, authz: Arc<A>, settings: Arc<C>, config: ServerConfig) -> Self {
        Self {
            store,
            authz,
            settings,
            limits: config.page_limits(),
            max_batch_size: config.loader.max_batch_size,
            config,
        }
    }

    /// Opens the scope of one request.
    pub fn new_scope(&self, session: Session) -> RequestScope<S> {
        RequestScope::new(
            session,
            Arc::clone(&self.store),
            self.max_batch_size,
            self.config.request_timeout(),
        )
    }

    pub fn server_config(&self) -> &ServerConfig {
        &self.config
    }

    fn gate<'a>(&'a self, scope: &'a RequestScope<S>) -> AuthorizationGate<'a, A> {
        AuthorizationGate::new(self.authz.as_ref(), scope.session())
    }
}
