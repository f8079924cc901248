use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde_json::json;
use syncforge_types::{CanonicalStatus, MappedUpdate, MappingInfo, Metadata, StatusUpdate, System};
use tracing::{debug, warn};

use crate::error::{MapperError, Result};
use crate::tables::{DefaultTables, MappingKind};

/// Whether an unmapped value is a hard failure or passes through unchanged
/// (spec.md §4.1 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    Strict,
    Lenient,
}

/// Construction-time configuration for [`StatusMapper`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub mode: MappingMode,
    pub enable_bidirectional_mapping: bool,
    pub enable_custom_mappings: bool,
    pub enable_validation: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            mode: MappingMode::Lenient,
            enable_bidirectional_mapping: true,
            enable_custom_mappings: true,
            enable_validation: false,
        }
    }
}

type CustomKey = (System, System, MappingKind);

/// Translates [`StatusUpdate`]s between the four systems' native
/// vocabularies (spec.md §4.1, component C1).
///
/// The default tables are immutable once built; only the custom-override
/// maps mutate, under a `RwLock` — many concurrent `mapStatus` readers,
/// writes only on `add_custom_mapping`/`remove_custom_mapping`, per
/// spec.md's concurrency note for this component.
pub struct StatusMapper {
    defaults: DefaultTables,
    config: MapperConfig,
    custom: RwLock<HashMap<CustomKey, HashMap<String, String>>>,
    /// Per-system allow-list of native status tokens, used when
    /// `enable_validation` is set. Defaults to the image of that system's
    /// status table.
    status_allow_lists: HashMap<System, HashSet<String>>,
}

impl StatusMapper {
    pub fn new(config: MapperConfig) -> Self {
        let defaults = DefaultTables::standard();
        let status_allow_lists = System::ALL
            .into_iter()
            .map(|system| {
                let allow: HashSet<String> = defaults
                    .forward(system, MappingKind::Status)
                    .0
                    .values()
                    .cloned()
                    .collect();
                (system, allow)
            })
            .collect();

        Self {
            defaults,
            config,
            custom: RwLock::new(HashMap::new()),
            status_allow_lists,
        }
    }

    /// Registers a custom `(src, dst, kind)` override; per spec.md §4.1,
    /// also updates the inverse `(dst, src, kind)` table when bidirectional
    /// mapping is enabled.
    pub fn add_custom_mapping(
        &self,
        src: System,
        dst: System,
        src_value: impl Into<String>,
        dst_value: impl Into<String>,
        kind: MappingKind,
    ) {
        if !self.config.enable_custom_mappings {
            warn!("custom mappings disabled; ignoring add_custom_mapping");
            return;
        }
        let src_value = src_value.into();
        let dst_value = dst_value.into();

        let mut custom = self.custom.write().expect("custom mapping lock poisoned");
        custom
            .entry((src, dst, kind))
            .or_default()
            .insert(src_value.clone(), dst_value.clone());

        if self.config.enable_bidirectional_mapping {
            custom
                .entry((dst, src, kind))
                .or_default()
                .insert(dst_value, src_value);
        }
    }

    /// Removes a custom `(src, dst, kind)` override (and its inverse, if
    /// bidirectional mapping is enabled).
    pub fn remove_custom_mapping(&self, src: System, dst: System, src_value: &str, kind: MappingKind) {
        let mut custom = self.custom.write().expect("custom mapping lock poisoned");
        let dst_value = custom.get(&(src, dst, kind)).and_then(|t| t.get(src_value)).cloned();
        if let Some(table) = custom.get_mut(&(src, dst, kind)) {
            table.remove(src_value);
        }
        if self.config.enable_bidirectional_mapping {
            if let Some(dst_value) = dst_value {
                if let Some(table) = custom.get_mut(&(dst, src, kind)) {
                    table.remove(&dst_value);
                }
            }
        }
    }

    /// Translates one field's value from `src`'s vocabulary to `dst`'s,
    /// per the three-step algorithm in spec.md §4.1.
    pub fn map_value(&self, src: System, dst: System, kind: MappingKind, value: &str) -> Result<String> {
        if let Some(custom_hit) = self.custom_lookup(src, dst, kind, value) {
            return Ok(custom_hit);
        }

        let canonical = self.defaults.forward(src, kind).reverse().get(value).cloned();
        let mapped = canonical.and_then(|c| self.defaults.forward(dst, kind).0.get(&c).cloned());

        match mapped {
            Some(v) => Ok(v),
            None => match self.config.mode {
                MappingMode::Strict => Err(MapperError::Unmapped {
                    kind: kind.as_str(),
                    value: value.to_string(),
                    src,
                    dst,
                }),
                MappingMode::Lenient => {
                    debug!(%src, %dst, kind = kind.as_str(), %value, "unmapped value, passing through");
                    Ok(value.to_string())
                }
            },
        }
    }

    fn custom_lookup(&self, src: System, dst: System, kind: MappingKind, value: &str) -> Option<String> {
        if !self.config.enable_custom_mappings {
            return None;
        }
        let custom = self.custom.read().expect("custom mapping lock poisoned");
        custom.get(&(src, dst, kind)).and_then(|t| t.get(value)).cloned()
    }

    /// Converts a native status token under `system` to the canonical
    /// vocabulary, consulting custom overrides to `Relational` first (the
    /// sovereign system) and falling back to the default table. Returns
    /// `None` when the token is unrecognized, which callers (the conflict
    /// detector) treat as "skip, can't validate".
    pub fn to_canonical_status(&self, system: System, native: &str) -> Option<CanonicalStatus> {
        if system == System::Relational {
            return CanonicalStatus::from_str_opt(native);
        }
        let canonical = self
            .defaults
            .forward(system, MappingKind::Status)
            .reverse()
            .get(native)
            .cloned()?;
        CanonicalStatus::from_str_opt(&canonical)
    }

    /// Translates one [`StatusUpdate`] into `dst`'s vocabulary.
    pub fn map_status(&self, update: &StatusUpdate, src: System, dst: System) -> Result<MappedUpdate> {
        let status = self.map_value(src, dst, MappingKind::Status, &update.status)?;
        let previous_status = update
            .previous_status
            .as_deref()
            .map(|p| self.map_value(src, dst, MappingKind::Status, p))
            .transpose()?;
        let entity_type = self.map_value(
            src,
            dst,
            MappingKind::EntityType,
            update.entity_type.as_str(),
        )?;
        let priority = update
            .priority
            .as_deref()
            .map(|p| self.map_value(src, dst, MappingKind::Priority, p))
            .transpose()?;

        if self.config.enable_validation {
            let allow = self.status_allow_lists.get(&dst);
            if let Some(allow) = allow {
                if !allow.contains(&status) {
                    return Err(MapperError::ValidationRejected { dst, value: status });
                }
            }
        }

        let metadata = transform_metadata(&update.metadata, dst);

        Ok(MappedUpdate {
            entity_id: update.entity_id.clone(),
            entity_type,
            status,
            previous_status,
            priority,
            source: src,
            target: dst,
            timestamp: update.timestamp,
            metadata,
            mapping_info: MappingInfo {
                original_system: src,
                target_system: dst,
                mapped_at: syncforge_types::now_ms(),
            },
        })
    }

    /// Maps `update` to every one of the four systems. Never fails as a
    /// whole: per-target errors are captured in the returned map, per
    /// spec.md §4.1 ("never throws").
    pub fn map_to_all_systems(
        &self,
        update: &StatusUpdate,
        src: System,
    ) -> HashMap<System, Result<MappedUpdate>> {
        System::ALL
            .into_iter()
            .map(|dst| (dst, self.map_status(update, src, dst)))
            .collect()
    }
}

/// Per-target metadata transforms from spec.md §4.1: labels -> labelIds for
/// the tracker, single-assignee -> assignee list for the VCS, always stamp
/// `updated_at` for the relational store, wrap under `jobMetadata` for the
/// agent service.
fn transform_metadata(metadata: &Metadata, target: System) -> Metadata {
    let mut out = metadata.clone();

    match target {
        System::Tracker => {
            if let Some(labels) = out.0.remove("labels") {
                out.0.insert("labelIds".to_string(), labels);
            }
        }
        System::Vcs => {
            if let Some(assignee) = out.0.remove("assignee") {
                out.0.insert("assignees".to_string(), json!([assignee]));
            }
        }
        System::Relational => {
            out.insert("updated_at", json!(syncforge_types::now_ms()));
        }
        System::AgentService => {
            let inner = serde_json::to_value(&out.0).unwrap_or_else(|_| json!({}));
            let mut wrapped = Metadata::new();
            wrapped.insert("jobMetadata", inner);
            out = wrapped;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncforge_types::EntityType;

    fn mapper() -> StatusMapper {
        StatusMapper::new(MapperConfig::default())
    }

    #[test]
    fn task_completion_maps_to_each_system_native_token() {
        let mapper = mapper();
        let update = StatusUpdate::new(EntityType::Task, "T1", "Done", System::Tracker);

        let relational = mapper.map_status(&update, System::Tracker, System::Relational).unwrap();
        assert_eq!(relational.status, "completed");

        let vcs = mapper.map_status(&update, System::Tracker, System::Vcs).unwrap();
        assert_eq!(vcs.status, "merged");

        let agent = mapper.map_status(&update, System::Tracker, System::AgentService).unwrap();
        assert_eq!(agent.status, "success");
    }

    #[test]
    fn custom_mapping_takes_precedence_and_is_immediate() {
        let mapper = mapper();
        mapper.add_custom_mapping(
            System::Tracker,
            System::Vcs,
            "Triage",
            "needs-triage",
            MappingKind::Status,
        );

        let update = StatusUpdate::new(EntityType::Task, "T1", "Triage", System::Tracker);
        let mapped = mapper.map_status(&update, System::Tracker, System::Vcs).unwrap();
        assert_eq!(mapped.status, "needs-triage");
    }

    #[test]
    fn bidirectional_custom_mapping_round_trips() {
        let mapper = mapper();
        mapper.add_custom_mapping(
            System::Tracker,
            System::Vcs,
            "Triage",
            "needs-triage",
            MappingKind::Status,
        );

        assert_eq!(
            mapper
                .map_value(System::Vcs, System::Tracker, MappingKind::Status, "needs-triage")
                .unwrap(),
            "Triage"
        );
    }

    #[test]
    fn strict_mode_rejects_unmapped_value() {
        let mapper = StatusMapper::new(MapperConfig {
            mode: MappingMode::Strict,
            ..MapperConfig::default()
        });
        let update = StatusUpdate::new(EntityType::Task, "T1", "totally-unknown", System::Tracker);
        let err = mapper.map_status(&update, System::Tracker, System::Vcs).unwrap_err();
        assert!(matches!(err, MapperError::Unmapped { .. }));
    }

    #[test]
    fn lenient_mode_passes_unmapped_value_through() {
        let mapper = mapper();
        let update = StatusUpdate::new(EntityType::Task, "T1", "totally-unknown", System::Tracker);
        let mapped = mapper.map_status(&update, System::Tracker, System::Vcs).unwrap();
        assert_eq!(mapped.status, "totally-unknown");
    }

    #[test]
    fn map_to_all_systems_never_panics_and_covers_four_targets() {
        let mapper = mapper();
        let update = StatusUpdate::new(EntityType::Task, "T1", "Done", System::Tracker);
        let all = mapper.map_to_all_systems(&update, System::Tracker);
        assert_eq!(all.len(), 4);
        assert!(all.values().all(Result::is_ok));
    }

    #[test]
    fn relational_metadata_always_gets_updated_at() {
        let mapper = mapper();
        let update = StatusUpdate::new(EntityType::Task, "T1", "Done", System::Tracker);
        let mapped = mapper.map_status(&update, System::Tracker, System::Relational).unwrap();
        assert!(mapped.metadata.contains_key("updated_at"));
    }

    #[test]
    fn agent_service_metadata_wraps_under_job_metadata() {
        let mapper = mapper();
        let mut update = StatusUpdate::new(EntityType::Task, "T1", "Done", System::Tracker);
        update.metadata.insert("foo", "bar");
        let mapped = mapper.map_status(&update, System::Tracker, System::AgentService).unwrap();
        assert!(mapped.metadata.contains_key("jobMetadata"));
    }

    #[test]
    fn to_canonical_status_recognizes_default_tokens() {
        let mapper = mapper();
        assert_eq!(
            mapper.to_canonical_status(System::Tracker, "Done"),
            Some(CanonicalStatus::Completed)
        );
        assert_eq!(mapper.to_canonical_status(System::Tracker, "no-such-token"), None);
    }

    proptest::proptest! {
        #[test]
        fn any_canonical_status_round_trips_through_vcs(idx in 0usize..5) {
            let mapper = mapper();
            let canonical = CanonicalStatus::ALL[idx];
            let native_relational = canonical.as_str();
            let to_vcs = mapper
                .map_value(System::Relational, System::Vcs, MappingKind::Status, native_relational)
                .unwrap();
            let back = mapper
                .map_value(System::Vcs, System::Relational, MappingKind::Status, &to_vcs)
                .unwrap();
            prop_assert_eq!(back, native_relational);
        }
    }
}
