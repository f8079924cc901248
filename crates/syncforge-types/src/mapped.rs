use serde::{Deserialize, Serialize};

use crate::{metadata::Metadata, system::System, TimestampMs};

/// Bookkeeping the mapper always appends to a mapped copy (spec.md §4.1:
/// "A `mappingInfo` sub-object is always appended").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingInfo {
    pub original_system: System,
    pub target_system: System,
    pub mapped_at: TimestampMs,
}

/// One [`crate::StatusUpdate`] translated into a single target system's
/// native vocabulary (spec.md §4.1's `mapStatus` return value).
///
/// Every field here is a native token for `target_system`: `status`,
/// `entity_type`, and `priority` are no longer canonical, they are exactly
/// what that system expects on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedUpdate {
    pub entity_id: String,
    pub entity_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub source: System,
    pub target: System,
    pub timestamp: TimestampMs,
    pub metadata: Metadata,
    pub mapping_info: MappingInfo,
}
