//! fieldgate-server: Request scope, field resolvers and response envelope
//!
//! This crate wires the domain building blocks to a data store and an
//! authorization oracle:
//! - Configuration loading (file + environment)
//! - Structured logging setup
//! - Per-request scope with deadline and batching loaders
//! - Field resolvers for channels, members, teams, users and insights
//! - Error classification and partial-result responses
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              fieldgate-server               │
//! ├─────────────────────────────────────────────┤
//! │  config.rs        - Configuration           │
//! │  observability.rs - Logging setup           │
//! │  settings.rs      - Client config/license   │
//! │  resolver/        - Field resolvers         │
//! │  errors.rs        - Error classification    │
//! │  response.rs      - Data + errors envelope  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod observability;
pub mod resolver;
pub mod response;
pub mod settings;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServerConfig};
pub use errors::{
    classify_domain_error, classify_domain_error_with_config, ClassifiedError, ErrorConfig,
    ErrorKind, FieldError,
};
pub use observability::{init_logging, LoggingConfig};
pub use resolver::{
    ChannelMembersArgs, ChannelsArgs, InsightsArgs, RequestScope, Resolver,
};
pub use response::QueryResponse;
pub use settings::{ClientSettingsSource, MemoryClientSettings, StringMap};
