use syncforge_adapter::Adapter;
use syncforge_mapper::StatusMapper;
use syncforge_types::{
    Conflict, ConflictDetail, ConflictSeverity, ConflictType, EntityKey, StatusUpdate,
};

use crate::history::ConflictHistory;
use crate::rules::BusinessRule;

/// Tuning for [`ConflictDetector`] (spec.md §4.3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    /// Window within which two updates to the same entity from different
    /// systems are treated as concurrent.
    pub concurrent_window_ms: i64,
    /// Conflict count at or above which [`crate::ConflictResolver`]
    /// escalates instead of attempting automatic resolution.
    pub escalation_threshold: usize,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            concurrent_window_ms: 5_000,
            escalation_threshold: 3,
        }
    }
}

/// Runs the four conflict checks from spec.md §4.3 over an incoming
/// update, in the order the spec lists them. Each check is independent and
/// all four run, so a single update can surface more than one [`Conflict`].
pub struct ConflictDetector {
    config: ConflictConfig,
    history: ConflictHistory,
    mapper: std::sync::Arc<StatusMapper>,
    business_rules: Vec<BusinessRule>,
}

impl ConflictDetector {
    pub fn new(config: ConflictConfig, mapper: std::sync::Arc<StatusMapper>) -> Self {
        let history = ConflictHistory::new(config.concurrent_window_ms);
        Self {
            config,
            history,
            mapper,
            business_rules: Vec::new(),
        }
    }

    pub fn with_business_rule(mut self, rule: BusinessRule) -> Self {
        self.business_rules.push(rule);
        self
    }

    pub fn sweep(&self, now: syncforge_types::TimestampMs) {
        self.history.sweep(now);
    }

    /// Runs all four checks, returning every conflict found (possibly
    /// none).
    pub async fn detect(&self, update: &StatusUpdate, adapter: &dyn Adapter) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        if let Some(conflict) = self.concurrent_update(update) {
            conflicts.push(conflict);
        }
        if let Some(conflict) = self.invalid_state_transition(update) {
            conflicts.push(conflict);
        }
        if let Some(conflict) = self.dependency_conflict(update, adapter).await {
            conflicts.push(conflict);
        }
        conflicts.extend(self.business_rule_violations(update));

        conflicts
    }

    /// Check 1: a different system wrote the same entity within
    /// `concurrent_window_ms` of this update (spec.md §4.3(1)).
    fn concurrent_update(&self, update: &StatusUpdate) -> Option<Conflict> {
        let prior = self.history.record_and_check(update)?;
        Some(
            Conflict::new(
                ConflictType::ConcurrentUpdate,
                ConflictSeverity::Medium,
                update.source,
                format!(
                    "{} and {} both updated {}:{} within {}ms",
                    prior.source, update.source, update.entity_type, update.entity_id,
                    self.config.concurrent_window_ms
                ),
            )
            .with_detail(ConflictDetail {
                colliding_systems: vec![prior.source, update.source],
                colliding_status: Some(prior.status.clone()),
                colliding_timestamp: Some(prior.timestamp),
                ..ConflictDetail::default()
            }),
        )
    }

    /// Check 2: `previous_status` is present but the canonical transition
    /// it implies is illegal (spec.md §4.3(2)). Absence of
    /// `previous_status` means there is nothing to check against, per the
    /// open-question decision in DESIGN.md.
    fn invalid_state_transition(&self, update: &StatusUpdate) -> Option<Conflict> {
        let previous_native = update.previous_status.as_deref()?;
        let previous = self.mapper.to_canonical_status(update.source, previous_native)?;
        let next = self.mapper.to_canonical_status(update.source, &update.status)?;

        if previous.can_transition_to(next) {
            return None;
        }

        Some(
            Conflict::new(
                ConflictType::InvalidStateTransition,
                ConflictSeverity::High,
                update.source,
                format!("illegal transition {previous} -> {next}"),
            )
            .with_detail(ConflictDetail {
                previous_status: Some(previous),
                new_status: Some(next),
                valid_transitions: previous.allowed_transitions().to_vec(),
                ..ConflictDetail::default()
            }),
        )
    }

    /// Check 3: the target adapter reports entities blocking completion
    /// (spec.md §4.3(3)).
    async fn dependency_conflict(
        &self,
        update: &StatusUpdate,
        adapter: &dyn Adapter,
    ) -> Option<Conflict> {
        let entity = EntityKey::new(update.entity_type, update.entity_id.clone());
        let incomplete = adapter.incomplete_dependencies(&entity).await;
        if incomplete.is_empty() {
            return None;
        }

        Some(
            Conflict::new(
                ConflictType::DependencyConflict,
                ConflictSeverity::Medium,
                update.source,
                format!("{entity} has {} incomplete dependencies", incomplete.len()),
            )
            .with_detail(ConflictDetail {
                incomplete_dependencies: incomplete,
                ..ConflictDetail::default()
            }),
        )
    }

    /// Check 4: every registered [`BusinessRule`] against the update
    /// (spec.md §4.3(4)). Unlike the other three checks this can produce
    /// more than one conflict.
    fn business_rule_violations(&self, update: &StatusUpdate) -> Vec<Conflict> {
        self.business_rules
            .iter()
            .filter_map(|rule| {
                rule.evaluate(update).err().map(|reason| {
                    Conflict::new(
                        ConflictType::BusinessRuleViolation,
                        ConflictSeverity::Medium,
                        update.source,
                        reason,
                    )
                    .with_detail(ConflictDetail {
                        rule: Some(rule.name().to_string()),
                        ..ConflictDetail::default()
                    })
                })
            })
            .collect()
    }
}
