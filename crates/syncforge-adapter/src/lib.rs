//! # syncforge-adapter
//!
//! The Adapter Facade (C5): a uniform, cancel-aware dispatch interface to
//! each of the four external systems. Concrete implementations (the REST/
//! GraphQL clients for the issue tracker and VCS, the SQL persistence
//! layer, the agent-service client) are out of scope per spec.md §1 — this
//! crate fixes only the call contract from spec.md §6, plus a trivial
//! in-memory stub used by tests and the demo binary.

mod error;
mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use syncforge_types::{EntityKey, MappedUpdate, System, TimestampMs};

pub use error::AdapterError;
pub use stub::StubAdapter;

/// The result of a successful `apply` call (spec.md §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub system: System,
    pub entity_id: String,
    pub status: String,
    pub timestamp: TimestampMs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthCheck {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            detail: None,
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            detail: Some(detail.into()),
        }
    }
}

/// One external system's dispatch surface (spec.md §4.5/§6).
///
/// `apply` is idempotent in intent given a stable `entity_id` — target
/// implementations SHOULD tolerate replays, though that guarantee lives in
/// the (out-of-scope) implementation, not here. Every method must be
/// cancel-aware: the orchestrator enforces the dispatch timeout from the
/// caller's side (spec.md §5), not the adapter's.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn system(&self) -> System;

    async fn apply(&self, update: &MappedUpdate) -> Result<ApplyResult, AdapterError>;

    async fn health_check(&self) -> HealthCheck;

    /// Returns the ids of entities that block `entity` from completing, if
    /// any. Used by the conflict detector's dependency check (spec.md
    /// §4.3(3)). The default stub always reports no blockers, matching the
    /// "intended behavior, pluggable predicate" note in spec.md §9's open
    /// questions.
    async fn incomplete_dependencies(&self, _entity: &EntityKey) -> Vec<String> {
        Vec::new()
    }
}
