use serde::{Deserialize, Serialize};

use crate::{entity::EntityType, metadata::Metadata, system::System, TimestampMs};

/// The unit of synchronization (spec.md §3).
///
/// `status` and `previous_status` are system-specific tokens exactly as
/// `source` emitted them — spec.md is explicit that status is "a
/// system-specific token", not a canonical one. Translating a native token
/// to and from the canonical vocabulary is the mapper's (C1) job; this type
/// only carries the value, it doesn't interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub source: System,
    pub timestamp: TimestampMs,
    #[serde(default)]
    pub metadata: Metadata,
}

impl StatusUpdate {
    /// Builds a new update with `timestamp` assigned to now, as spec.md §3
    /// requires ("assigned on acceptance").
    pub fn new(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        status: impl Into<String>,
        source: System,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type,
            status: status.into(),
            previous_status: None,
            priority: None,
            source,
            timestamp: crate::now_ms(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_previous_status(mut self, previous: impl Into<String>) -> Self {
        self.previous_status = Some(previous.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Required-field validation used by the orchestrator's entry point
    /// (spec.md §4.6 step 1). `entity_id` and `status` must be non-empty;
    /// the remaining required fields are structurally guaranteed by the
    /// type system.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.entity_id.trim().is_empty() {
            return Err("entity_id must not be empty");
        }
        if self.status.trim().is_empty() {
            return Err("status must not be empty");
        }
        Ok(())
    }

    /// The deduplication key from spec.md §4.2:
    /// `entityType:entityId:status:source`.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.entity_type, self.entity_id, self.status, self.source
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_entity_id() {
        let u = StatusUpdate::new(EntityType::Task, "", "pending", System::Tracker);
        assert!(u.validate().is_err());
    }

    #[test]
    fn rejects_empty_status() {
        let u = StatusUpdate::new(EntityType::Task, "T1", "", System::Tracker);
        assert!(u.validate().is_err());
    }

    #[test]
    fn dedup_key_format() {
        let u = StatusUpdate::new(EntityType::Task, "T1", "Open", System::Tracker);
        assert_eq!(u.dedup_key(), "task:T1:Open:tracker");
    }
}
