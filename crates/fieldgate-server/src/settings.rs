//! Client configuration and license source.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use fieldgate_domain::DomainResult;

/// Flat string map served to clients.
pub type StringMap = BTreeMap<String, String>;

/// Supplies the client configuration and license maps.
#[async_trait]
pub trait ClientSettingsSource: Send + Sync + 'static {
    /// Configuration safe for anonymous sessions.
    async fn limited_config(&self) -> DomainResult<StringMap>;

    /// Full client configuration for signed-in sessions.
    async fn full_config(&self) -> DomainResult<StringMap>;

    /// License details for sessions allowed to read them.
    async fn license(&self) -> DomainResult<StringMap>;

    /// License details with sensitive fields removed.
    async fn sanitized_license(&self) -> DomainResult<StringMap>;
}

/// In-memory settings. Each entry is marked public or not; the limited
/// config and sanitized license contain only public entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryClientSettings {
    config: StringMap,
    public_config: BTreeSet<String>,
    license: StringMap,
    public_license: BTreeSet<String>,
}

impl MemoryClientSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, key: &str, value: &str, public: bool) -> Self {
        self.config.insert(key.to_string(), value.to_string());
        if public {
            self.public_config.insert(key.to_string());
        }
        self
    }

    pub fn with_license(mut self, key: &str, value: &str, public: bool) -> Self {
        self.license.insert(key.to_string(), value.to_string());
        if public {
            self.public_license.insert(key.to_string());
        }
        self
    }
}

fn filter_public(map: &StringMap, public: &BTreeSet<String>) -> StringMap {
    map.iter()
        .filter(|(k, _)| public.contains(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[async_trait]
impl ClientSettingsSource for MemoryClientSettings {
    async fn limited_config(&self) -> DomainResult<StringMap> {
        Ok(filter_public(&self.config, &self.public_config))
    }

    async fn full_config(&self) -> DomainResult<StringMap> {
        Ok(self.config.clone())
    }

    async fn license(&self) -> DomainResult<StringMap> {
        Ok(self.license.clone())
    }

    async fn sanitized_license(&self) -> DomainResult<StringMap> {
        Ok(filter_public(&self.license, &self.public_license))
    }
}
