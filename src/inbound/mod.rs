//! Inbound configuration records.
//!
//! # Data Flow
//! ```text
//! admin request
//!     → gateway.rs (validate, stamp owner/enable/tag)
//!     → store.rs (durable write)
//!     → RestartFlag::mark_dirty (only after the write succeeded)
//! ```
//!
//! # Design Decisions
//! - Owner and tag are always set server-side
//! - Batches are validated completely before the single store write
//! - Store errors reach the caller unchanged

pub mod gateway;
pub mod model;
pub mod store;

pub use gateway::{
    parse_inbound_id, MutationError, MutationGateway, ValidationError, MAX_BATCH_SIZE,
};
pub use model::{
    inbound_tag, InboundConfig, InboundId, InboundPatch, InboundSettings, NewInbound, OwnerId,
};
pub use store::{ConfigStore, MemoryStore, StoreError};
