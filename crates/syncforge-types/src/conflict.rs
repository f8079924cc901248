use serde::{Deserialize, Serialize};

use crate::{status::CanonicalStatus, system::System, TimestampMs};

/// One of the four conflict families detected by C3 (spec.md §3/§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    ConcurrentUpdate,
    InvalidStateTransition,
    DependencyConflict,
    BusinessRuleViolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

/// A detected conflict. The type-specific fields spec.md names
/// (`previousStatus`, `newStatus`, `validTransitions`, `rule`) live in
/// `detail` so the common fields stay flat and every detector can construct
/// a `Conflict` uniformly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub source_system: System,
    pub description: String,
    pub timestamp: TimestampMs,
    pub detail: ConflictDetail,
}

/// Type-specific conflict payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<CanonicalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<CanonicalStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub valid_transitions: Vec<CanonicalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub colliding_systems: Vec<System>,
    /// The colliding system's own status/timestamp, captured alongside
    /// `colliding_systems` so a resolution strategy can pick an actual
    /// winner's value instead of only learning who collided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colliding_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colliding_timestamp: Option<TimestampMs>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub incomplete_dependencies: Vec<String>,
}

impl Conflict {
    pub fn new(
        conflict_type: ConflictType,
        severity: ConflictSeverity,
        source_system: System,
        description: impl Into<String>,
    ) -> Self {
        Self {
            conflict_type,
            severity,
            source_system,
            description: description.into(),
            timestamp: crate::now_ms(),
            detail: ConflictDetail::default(),
        }
    }

    pub fn with_detail(mut self, detail: ConflictDetail) -> Self {
        self.detail = detail;
        self
    }
}
