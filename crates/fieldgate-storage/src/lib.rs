//! fieldgate-storage: Storage abstraction layer
//!
//! This crate provides the data-access contract consumed by the resolution
//! layer:
//! - Record types (users, channels, memberships, roles, insights rows)
//! - DataStore trait with cursor-ordered range scans and batch-by-key lookups
//! - In-memory implementation for testing and embedding
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             fieldgate-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - DataStore trait + records    │
//! │  memory.rs   - In-memory implementation     │
//! │  error.rs    - StorageError                 │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryDataStore;
pub use traits::{
    Channel, ChannelFilter, ChannelLeave, ChannelMember, ChannelType, DataStore, InsightsQuery,
    MemberKey, Role, TeamMember, TopChannel, TopReaction, User,
};
