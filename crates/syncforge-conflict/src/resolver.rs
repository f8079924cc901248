use std::collections::HashMap;

use async_trait::async_trait;
use syncforge_types::{Conflict, ConflictType, Resolution, ResolutionStrategyKind, StatusUpdate, System};

use crate::error::{ConflictError, Result};

/// Priority ranking used by [`PriorityBasedStrategy`] (spec.md §4.3's
/// "priority-based" strategy): lower number wins. Systems not listed fall
/// back to the lowest priority.
pub fn default_system_priority(system: System) -> u8 {
    match system {
        System::Relational => 0,
        System::AgentService => 1,
        System::Tracker => 2,
        System::Vcs => 3,
    }
}

/// Resolves a batch of [`Conflict`]s for one candidate update into a single
/// [`Resolution`] (spec.md §4.3). Implementations may be synchronous in
/// practice; the trait is async because `Manual` defers to an external
/// approval channel that is inherently async.
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    fn kind(&self) -> ResolutionStrategyKind;

    async fn resolve(
        &self,
        candidate: &StatusUpdate,
        conflicts: &[Conflict],
    ) -> Result<Resolution>;
}

/// Picks the update from the system with the highest configured priority
/// (lowest rank number) among the candidate and every system that
/// collided with it. The winner's own status and timestamp — carried in
/// `ConcurrentUpdate` conflicts' `colliding_status`/`colliding_timestamp`
/// — become the resolved update's value.
pub struct PriorityBasedStrategy {
    priority: HashMap<System, u8>,
}

impl PriorityBasedStrategy {
    pub fn new() -> Self {
        Self {
            priority: System::ALL.into_iter().map(|s| (s, default_system_priority(s))).collect(),
        }
    }

    pub fn with_priority(mut self, system: System, rank: u8) -> Self {
        self.priority.insert(system, rank);
        self
    }

    fn rank(&self, system: System) -> u8 {
        self.priority.get(&system).copied().unwrap_or(u8::MAX)
    }
}

impl Default for PriorityBasedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResolutionStrategy for PriorityBasedStrategy {
    fn kind(&self) -> ResolutionStrategyKind {
        ResolutionStrategyKind::PriorityBased
    }

    async fn resolve(&self, candidate: &StatusUpdate, conflicts: &[Conflict]) -> Result<Resolution> {
        let mut winner = candidate.source;
        let mut winner_rank = self.rank(candidate.source);
        let mut winner_status = candidate.status.clone();
        let mut winner_timestamp = candidate.timestamp;

        for detail in concurrent_conflict_details(candidate.source, conflicts) {
            let rank = self.rank(detail.system);
            if rank < winner_rank {
                winner_rank = rank;
                winner = detail.system;
                winner_status = detail.status;
                winner_timestamp = detail.timestamp;
            }
        }

        let mut resolved_update = candidate.clone();
        resolved_update.source = winner;
        resolved_update.status = winner_status;
        resolved_update.timestamp = winner_timestamp;

        Ok(Resolution {
            resolved_update,
            winning_system: winner,
            reason: format!("{winner} has the highest configured priority"),
            conflicts_resolved: conflicts.len(),
            strategy: self.kind(),
            automatic: true,
            timestamp: syncforge_types::now_ms(),
        })
    }
}

/// A colliding system's identity plus the status/timestamp it wrote,
/// extracted from every `ConcurrentUpdate` conflict in `conflicts`.
struct CollidingUpdate {
    system: System,
    status: String,
    timestamp: syncforge_types::TimestampMs,
}

fn concurrent_conflict_details(candidate_source: System, conflicts: &[Conflict]) -> Vec<CollidingUpdate> {
    conflicts
        .iter()
        .filter(|c| c.conflict_type == ConflictType::ConcurrentUpdate)
        .filter_map(|c| {
            let system = *c.detail.colliding_systems.iter().find(|&&s| s != candidate_source)?;
            let status = c.detail.colliding_status.clone()?;
            let timestamp = c.detail.colliding_timestamp?;
            Some(CollidingUpdate { system, status, timestamp })
        })
        .collect()
}

/// Picks the most recently timestamped update among the candidate and any
/// colliding systems recorded in the conflicts — last write wins,
/// deterministically, never deferring to manual review.
pub struct TimestampBasedStrategy;

#[async_trait]
impl ResolutionStrategy for TimestampBasedStrategy {
    fn kind(&self) -> ResolutionStrategyKind {
        ResolutionStrategyKind::TimestampBased
    }

    async fn resolve(&self, candidate: &StatusUpdate, conflicts: &[Conflict]) -> Result<Resolution> {
        let mut winner = candidate.source;
        let mut winner_status = candidate.status.clone();
        let mut winner_timestamp = candidate.timestamp;

        for detail in concurrent_conflict_details(candidate.source, conflicts) {
            if detail.timestamp > winner_timestamp {
                winner = detail.system;
                winner_status = detail.status;
                winner_timestamp = detail.timestamp;
            }
        }

        let mut resolved_update = candidate.clone();
        resolved_update.source = winner;
        resolved_update.status = winner_status;
        resolved_update.timestamp = winner_timestamp;

        Ok(Resolution {
            resolved_update,
            winning_system: winner,
            reason: format!("{winner} carries the most recent timestamp"),
            conflicts_resolved: conflicts.len(),
            strategy: self.kind(),
            automatic: true,
            timestamp: syncforge_types::now_ms(),
        })
    }
}

/// Always defers to a human: returns `ManualResolutionRequired` so the
/// orchestrator escalates per spec.md §4.3's manual strategy description.
pub struct ManualStrategy;

#[async_trait]
impl ResolutionStrategy for ManualStrategy {
    fn kind(&self) -> ResolutionStrategyKind {
        ResolutionStrategyKind::Manual
    }

    async fn resolve(&self, _candidate: &StatusUpdate, conflicts: &[Conflict]) -> Result<Resolution> {
        Err(ConflictError::ManualResolutionRequired(conflicts.len()))
    }
}

/// Reconciles rather than rejects: on an `invalid_state_transition`
/// conflict, rolls the status back to the transition's recorded
/// `previous_status` instead of applying the illegal next value.
/// Otherwise keeps the candidate's status as-is.
pub struct MergeStrategy;

#[async_trait]
impl ResolutionStrategy for MergeStrategy {
    fn kind(&self) -> ResolutionStrategyKind {
        ResolutionStrategyKind::Merge
    }

    async fn resolve(&self, candidate: &StatusUpdate, conflicts: &[Conflict]) -> Result<Resolution> {
        let rollback = conflicts
            .iter()
            .find(|c| c.conflict_type == ConflictType::InvalidStateTransition)
            .and_then(|c| c.detail.previous_status);

        let mut resolved_update = candidate.clone();
        let reason = match rollback {
            Some(previous) => {
                resolved_update.status = previous.as_str().to_string();
                format!("rolled back to {previous} after an invalid state transition")
            }
            None => "merged without a mutually-exclusive state conflict".to_string(),
        };

        Ok(Resolution {
            resolved_update,
            winning_system: candidate.source,
            reason,
            conflicts_resolved: conflicts.len(),
            strategy: self.kind(),
            automatic: true,
            timestamp: syncforge_types::now_ms(),
        })
    }
}

/// Registry of named resolution strategies (spec.md §4.3's "pluggable
/// strategy" note). The four built-ins are registered by
/// [`ConflictResolver::with_defaults`]; callers may register additional
/// [`ResolutionStrategyKind::Custom`] strategies under their own name.
pub struct ConflictResolver {
    strategies: HashMap<String, Box<dyn ResolutionStrategy>>,
    escalation_threshold: usize,
}

impl ConflictResolver {
    pub fn new(escalation_threshold: usize) -> Self {
        Self {
            strategies: HashMap::new(),
            escalation_threshold,
        }
    }

    pub fn with_defaults(escalation_threshold: usize) -> Self {
        let mut resolver = Self::new(escalation_threshold);
        resolver.register("priority_based", Box::new(PriorityBasedStrategy::new()));
        resolver.register("timestamp_based", Box::new(TimestampBasedStrategy));
        resolver.register("manual", Box::new(ManualStrategy));
        resolver.register("merge", Box::new(MergeStrategy));
        resolver
    }

    pub fn register(&mut self, name: impl Into<String>, strategy: Box<dyn ResolutionStrategy>) {
        self.strategies.insert(name.into(), strategy);
    }

    /// Resolves `conflicts` against `candidate` using the named strategy.
    /// Escalates (spec.md §4.3) when `conflicts.len() >=
    /// escalation_threshold` regardless of what the strategy would have
    /// decided, since at that volume an automatic resolution is judged
    /// too risky to apply unsupervised.
    pub async fn resolve(
        &self,
        strategy_name: &str,
        candidate: &StatusUpdate,
        conflicts: &[Conflict],
    ) -> Result<Resolution> {
        if conflicts.len() >= self.escalation_threshold {
            return Err(ConflictError::Escalated {
                conflicts: conflicts.to_vec(),
            });
        }

        let strategy = self
            .strategies
            .get(strategy_name)
            .ok_or_else(|| ConflictError::UnknownStrategy(strategy_name.to_string()))?;

        let resolution = strategy.resolve(candidate, conflicts).await?;
        resolution
            .validate(conflicts.len(), true)
            .map_err(|e| ConflictError::InvalidResolution(e.to_string()))?;
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncforge_types::{CanonicalStatus, ConflictDetail, ConflictSeverity, EntityType};

    fn update() -> StatusUpdate {
        StatusUpdate::new(EntityType::Task, "T1", "Open", System::Relational)
    }

    fn concurrent_conflict(candidate_source: System, other_system: System, other_status: &str, other_timestamp: i64) -> Conflict {
        Conflict::new(ConflictType::ConcurrentUpdate, ConflictSeverity::Medium, other_system, "test conflict").with_detail(
            ConflictDetail {
                colliding_systems: vec![other_system, candidate_source],
                colliding_status: Some(other_status.to_string()),
                colliding_timestamp: Some(other_timestamp),
                ..ConflictDetail::default()
            },
        )
    }

    #[tokio::test]
    async fn priority_based_keeps_candidate_when_it_outranks_the_collider() {
        let strategy = PriorityBasedStrategy::new();
        let resolution = strategy
            .resolve(&update(), &[concurrent_conflict(System::Relational, System::Vcs, "failed", 500)])
            .await
            .unwrap();
        assert_eq!(resolution.winning_system, System::Relational);
        assert_eq!(resolution.resolved_update.status, "Open");
    }

    #[tokio::test]
    async fn priority_based_picks_the_colliding_system_when_it_outranks_the_candidate() {
        // spec.md §8 scenario 2: completed/tracker lands first, then
        // failed/vcs collides with it. Tracker outranks vcs, so it wins
        // and its status is what survives.
        let candidate = StatusUpdate::new(EntityType::Task, "T1", "failed", System::Vcs);
        let strategy = PriorityBasedStrategy::new();
        let resolution = strategy
            .resolve(&candidate, &[concurrent_conflict(System::Vcs, System::Tracker, "completed", 1_000)])
            .await
            .unwrap();
        assert_eq!(resolution.winning_system, System::Tracker);
        assert_eq!(resolution.resolved_update.status, "completed");
    }

    #[tokio::test]
    async fn timestamp_based_picks_the_newer_colliding_update() {
        let mut candidate = StatusUpdate::new(EntityType::Task, "T1", "in_progress", System::Tracker);
        candidate.timestamp = 1_000;
        let resolution = TimestampBasedStrategy
            .resolve(&candidate, &[concurrent_conflict(System::Tracker, System::Vcs, "completed", 5_000)])
            .await
            .unwrap();
        assert_eq!(resolution.winning_system, System::Vcs);
        assert_eq!(resolution.resolved_update.status, "completed");
    }

    #[tokio::test]
    async fn timestamp_based_keeps_candidate_when_it_is_newest() {
        let mut candidate = StatusUpdate::new(EntityType::Task, "T1", "in_progress", System::Tracker);
        candidate.timestamp = 9_000;
        let resolution = TimestampBasedStrategy
            .resolve(&candidate, &[concurrent_conflict(System::Tracker, System::Vcs, "completed", 100)])
            .await
            .unwrap();
        assert_eq!(resolution.winning_system, System::Tracker);
        assert_eq!(resolution.resolved_update.status, "in_progress");
    }

    #[tokio::test]
    async fn manual_strategy_always_defers() {
        let result = ManualStrategy
            .resolve(&update(), &[concurrent_conflict(System::Relational, System::Vcs, "failed", 0)])
            .await;
        assert!(matches!(result, Err(ConflictError::ManualResolutionRequired(_))));
    }

    #[tokio::test]
    async fn merge_rolls_back_an_invalid_transition() {
        // spec.md §8 scenario 3: pending -> completed is illegal, so merge
        // rolls the status back to the recorded previous_status.
        let candidate = StatusUpdate::new(EntityType::Task, "T1", "completed", System::Relational)
            .with_previous_status("pending");
        let conflict = Conflict::new(ConflictType::InvalidStateTransition, ConflictSeverity::High, System::Relational, "bad transition")
            .with_detail(ConflictDetail { previous_status: Some(CanonicalStatus::Pending), ..ConflictDetail::default() });

        let resolution = MergeStrategy.resolve(&candidate, &[conflict]).await.unwrap();
        assert_eq!(resolution.resolved_update.status, "pending");
    }

    #[tokio::test]
    async fn merge_leaves_status_untouched_without_a_transition_conflict() {
        let resolution = MergeStrategy.resolve(&update(), &[]).await.unwrap();
        assert_eq!(resolution.resolved_update.status, "Open");
    }

    #[tokio::test]
    async fn resolver_escalates_past_threshold() {
        let resolver = ConflictResolver::with_defaults(2);
        let conflict = concurrent_conflict(System::Relational, System::Vcs, "failed", 0);
        let conflicts = vec![conflict.clone(), conflict.clone(), conflict];
        let result = resolver.resolve("priority_based", &update(), &conflicts).await;
        assert!(matches!(result, Err(ConflictError::Escalated { .. })));
    }

    #[tokio::test]
    async fn resolver_unknown_strategy() {
        let resolver = ConflictResolver::with_defaults(10);
        let result = resolver.resolve("nonexistent", &update(), &[]).await;
        assert!(matches!(result, Err(ConflictError::UnknownStrategy(_))));
    }

    #[tokio::test]
    async fn resolver_resolves_with_priority_based() {
        let resolver = ConflictResolver::with_defaults(10);
        let conflicts = vec![concurrent_conflict(System::Relational, System::Vcs, "failed", 0)];
        let resolution = resolver.resolve("priority_based", &update(), &conflicts).await.unwrap();
        assert_eq!(resolution.conflicts_resolved, 1);
    }
}
