//! fieldgate-domain: Field resolution building blocks
//!
//! This crate contains the request-independent logic of the resolution layer:
//! - Opaque, kind-tagged pagination cursors
//! - Page requests, cursor pages and ranked ("top N") pages
//! - Capabilities, sessions and the authorization gate
//! - A request-scoped batching loader
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              fieldgate-domain               │
//! ├─────────────────────────────────────────────┤
//! │  cursor      - Cursor encode/decode         │
//! │  pagination  - Page sizes, look-ahead, rank │
//! │  insights    - Time ranges, insight paging  │
//! │  authz/      - Capabilities & gate          │
//! │  loader/     - Batching loader              │
//! └─────────────────────────────────────────────┘
//! ```

pub mod authz;
pub mod cursor;
pub mod error;
pub mod insights;
pub mod loader;
pub mod pagination;

// Re-export commonly used types at the crate root
pub use authz::{
    resolve_subject_id, AuthorizationDecision, AuthorizationGate, AuthorizationOracle, Capability,
    DeniedReason, MemoryAuthorizer, Resource, Session, ME,
};
pub use cursor::{ChannelCursor, ChannelMemberCursor, CursorKind, PageCursor};
pub use error::{DomainError, DomainResult};
pub use insights::{InsightsOptions, TimeRange};
pub use loader::{BatchFetch, BatchLoader, LoadError, LoadResult};
pub use pagination::{Page, PageLimits, PageRequest, Ranked, RankedPage, ValidatedPage};
