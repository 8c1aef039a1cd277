//! Ranked "top N" fields.

use chrono::Utc;
use fieldgate_domain::{
    AuthorizationOracle, Capability, DomainResult, InsightsOptions, PageLimits, RankedPage,
    Resource,
};
use fieldgate_storage::{DataStore, InsightsQuery, TopChannel, TopReaction};

use super::{RequestScope, Resolver};
use crate::settings::ClientSettingsSource;

/// Arguments shared by the insights fields.
#[derive(Debug, Clone)]
pub struct InsightsArgs {
    pub team_id: String,
    /// One of `1_day`, `7_day`, `28_day`.
    pub time_range: String,
    /// Zero-based page index.
    pub page: i32,
    /// Page size, at most the configured maximum; zero returns every row.
    pub per_page: i32,
}

impl InsightsArgs {
    fn query(&self, limits: &PageLimits) -> DomainResult<(InsightsOptions, InsightsQuery)> {
        let options = InsightsOptions::new(
            &self.time_range,
            self.page,
            self.per_page,
            limits.max_page_size,
            Utc::now(),
        )?;
        let query = InsightsQuery {
            team_id: self.team_id.clone(),
            since_unix_milli: options.start_unix_milli,
            offset: options.offset(),
            limit: options.fetch_limit(),
        };
        Ok((options, query))
    }
}

impl<S, A, C> Resolver<S, A, C>
where
    S: DataStore,
    A: AuthorizationOracle,
    C: ClientSettingsSource,
{
    pub async fn top_reactions(
        &self,
        scope: &RequestScope<S>,
        args: &InsightsArgs,
    ) -> DomainResult<RankedPage<TopReaction>> {
        self.gate(scope)
            .require(Capability::ViewTeam, &Resource::team(args.team_id.as_str()))
            .await?;
        let (options, query) = args.query(&self.limits)?;
        let rows = self.store.top_reactions_for_team(&query).await?;
        Ok(RankedPage::paginate(rows, options.per_page, options.offset()))
    }

    pub async fn top_channels(
        &self,
        scope: &RequestScope<S>,
        args: &InsightsArgs,
    ) -> DomainResult<RankedPage<TopChannel>> {
        self.gate(scope)
            .require(Capability::ViewTeam, &Resource::team(args.team_id.as_str()))
            .await?;
        let (options, query) = args.query(&self.limits)?;
        let rows = self.store.top_channels_for_team(&query).await?;
        Ok(RankedPage::paginate(rows, options.per_page, options.offset()))
    }
}
