//! # syncforge-types
//!
//! Shared data model for the cross-system status synchronization core.
//!
//! This crate has no behavior of its own — it is the vocabulary the other
//! `syncforge-*` crates share: the four external systems, the canonical
//! status/entity/priority tokens, the `StatusUpdate` unit of synchronization,
//! the `Event` the queue moves around, and the `Conflict`/`Resolution` pair
//! the conflict resolver produces.
//!
//! ```text
//! StatusUpdate --(C1 mapper)--> per-system mapped copies
//!       |
//!       +--(C2 queue)--> Event --(C3 resolver)--> Resolution
//! ```

mod conflict;
mod entity;
mod event;
mod mapped;
mod metadata;
mod resolution;
mod status;
mod system;
mod update;

pub use conflict::{Conflict, ConflictDetail, ConflictSeverity, ConflictType};
pub use entity::{EntityKey, EntityType};
pub use event::{Event, EventPriority, EventType};
pub use mapped::{MappedUpdate, MappingInfo};
pub use metadata::Metadata;
pub use resolution::{Resolution, ResolutionStrategyKind};
pub use status::CanonicalStatus;
pub use system::System;
pub use update::StatusUpdate;

/// Monotonic milliseconds since the Unix epoch, as spec.md's `timestamp`
/// field requires. A thin alias rather than a newtype so arithmetic against
/// durations stays ergonomic at call sites.
pub type TimestampMs = i64;

/// Returns the current time as [`TimestampMs`].
pub fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}
