//! # syncforge-orchestrator
//!
//! The Orchestrator (C6): the `synchronize` entry point that wires the
//! mapper (C1), queue (C2), conflict detector/resolver (C3), fan-out hub
//! (C4), and adapters (C5) together, recording everything through the
//! sync monitor (C7). See spec.md §4.6.

mod config;
mod error;
mod shard;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use syncforge_adapter::Adapter;
use syncforge_conflict::{ConflictDetector, ConflictResolver};
use syncforge_fanout::{FanoutHub, StatusUpdateSink};
use syncforge_mapper::StatusMapper;
use syncforge_monitor::SyncMonitor;
use syncforge_queue::{EventHandler, EventOutcome, EventQueue};
use syncforge_types::{now_ms, Conflict, EntityKey, Event, StatusUpdate, System, TimestampMs};
use tracing::{error, info, warn};
use uuid::Uuid;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use shard::ShardLock;

/// One target system's outcome within a [`SyncOutcome`] (spec.md §7:
/// "per-system failures appear under `results[system].error`").
#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The aggregate result `synchronize` returns (spec.md §7: `{syncId,
/// success, results, duration}`).
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub sync_id: Uuid,
    pub success: bool,
    pub results: HashMap<System, TargetResult>,
    pub duration_ms: i64,
}

/// The Orchestrator (C6): owns every other component and exposes
/// `synchronize` as the single entry point described by spec.md §4.6.
/// Explicitly constructed, matching spec.md §9's "singleton runtime state
/// -> explicit construction" redesign note — there is no process-global
/// instance.
pub struct Orchestrator {
    config: OrchestratorConfig,
    mapper: Arc<StatusMapper>,
    queue: Arc<EventQueue>,
    detector: Arc<ConflictDetector>,
    resolver: Arc<ConflictResolver>,
    adapters: HashMap<System, Arc<dyn Adapter>>,
    hub: Option<Arc<FanoutHub>>,
    monitor: Arc<SyncMonitor>,
    locks: ShardLock,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        mapper: Arc<StatusMapper>,
        queue: Arc<EventQueue>,
        detector: Arc<ConflictDetector>,
        resolver: Arc<ConflictResolver>,
        adapters: HashMap<System, Arc<dyn Adapter>>,
        monitor: Arc<SyncMonitor>,
    ) -> Self {
        let locks = ShardLock::new(config.shard_count);
        Self { config, mapper, queue, detector, resolver, adapters, hub: None, monitor, locks }
    }

    /// Attaches the fan-out hub so successful syncs broadcast to
    /// subscribers (spec.md §4.4's `broadcast` contract, rooms
    /// `entityType:entityId` and `entityType`).
    pub fn with_hub(mut self, hub: Arc<FanoutHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn monitor(&self) -> &Arc<SyncMonitor> {
        &self.monitor
    }

    fn adapter(&self, system: System) -> Result<&Arc<dyn Adapter>> {
        self.adapters.get(&system).ok_or(OrchestratorError::NoAdapter(system))
    }

    /// Runs the full spec.md §4.6 algorithm for one update: validate,
    /// serialize per entity, detect/resolve conflicts, map to every
    /// target, dispatch concurrently with "all-settled" semantics,
    /// aggregate, record, and broadcast.
    pub async fn synchronize(&self, update: StatusUpdate) -> Result<SyncOutcome> {
        update.validate().map_err(|e| OrchestratorError::Validation(e.to_string()))?;

        let entity = EntityKey::new(update.entity_type, update.entity_id.clone());
        let _guard = self.locks.acquire(&entity).await;

        let started = now_ms();
        let source_adapter = self.adapter(update.source)?;

        let conflicts = self.detector.detect(&update, source_adapter.as_ref()).await;
        let update = self.resolve_if_needed(update, conflicts).await?;

        let mapped = self.mapper.map_to_all_systems(&update, update.source);

        let dispatches = mapped.into_iter().map(|(system, mapped_result)| {
            let adapters = &self.adapters;
            let timeout = std::time::Duration::from_millis(self.config.dispatch_timeout_ms);
            async move {
                let result = match mapped_result {
                    Err(e) => Err(e.to_string()),
                    Ok(mapped_update) => match adapters.get(&system) {
                        None => Err(format!("no adapter registered for {system}")),
                        Some(adapter) => match tokio::time::timeout(timeout, adapter.apply(&mapped_update)).await {
                            Ok(Ok(_applied)) => Ok(()),
                            Ok(Err(e)) => Err(e.to_string()),
                            Err(_) => Err(format!("dispatch to {system} timed out")),
                        },
                    },
                };
                (system, result)
            }
        });

        let dispatched: Vec<(System, std::result::Result<(), String>)> = join_all(dispatches).await;
        let results: HashMap<System, TargetResult> = dispatched
            .into_iter()
            .map(|(system, result)| {
                let target = match result {
                    Ok(()) => TargetResult { success: true, error: None },
                    Err(e) => TargetResult { success: false, error: Some(e) },
                };
                (system, target)
            })
            .collect();

        let success = results.values().all(|r| r.success);
        let duration_ms = now_ms() - started;
        self.monitor.record_sync(success, duration_ms as f64);
        self.monitor.record_queue_depth(self.queue.metrics_snapshot().queue_depths.iter().sum());

        if success {
            self.broadcast(&entity, &update);
        }

        Ok(SyncOutcome { sync_id: Uuid::new_v4(), success, results, duration_ms })
    }

    async fn resolve_if_needed(&self, update: StatusUpdate, conflicts: Vec<Conflict>) -> Result<StatusUpdate> {
        if conflicts.is_empty() {
            return Ok(update);
        }
        self.monitor.record_conflict_detected();

        match self.resolver.resolve(&self.config.default_resolution_strategy, &update, &conflicts).await {
            Ok(resolution) => {
                self.monitor.record_conflict_resolved();
                Ok(resolution.resolved_update)
            }
            Err(syncforge_conflict::ConflictError::Escalated { .. })
            | Err(syncforge_conflict::ConflictError::ManualResolutionRequired(_)) => {
                self.monitor.record_conflict_escalated();
                Err(OrchestratorError::Conflict(conflicts))
            }
            Err(e) => Err(OrchestratorError::Internal(e.to_string())),
        }
    }

    fn broadcast(&self, entity: &EntityKey, update: &StatusUpdate) {
        let Some(hub) = &self.hub else { return };
        let payload = serde_json::json!({
            "entityType": entity.entity_type,
            "entityId": entity.entity_id,
            "status": update.status,
            "source": update.source,
            "timestamp": update.timestamp,
        });
        let envelope = syncforge_fanout::broadcast(payload);
        hub.broadcast(&envelope, Some(&entity.to_string()));
        hub.broadcast(&envelope, Some(entity.entity_type.as_str()));
    }

    /// Re-evaluates monitor thresholds and evicts stale conflict history
    /// (spec.md §5's bounded, FIFO-evicted conflict history) and stale
    /// dedup entries (spec.md §4.2's background sweep). Intended to be
    /// called on `sweep_interval_ms`.
    pub fn sweep(&self, now: TimestampMs) {
        self.detector.sweep(now);
        self.queue.sweep(now);
        for event in self.monitor.tick() {
            match event {
                syncforge_monitor::AlertEvent::Raised(alert) => {
                    warn!(alert_id = %alert.id, severity = ?alert.severity, "alert:raised: {}", alert.message);
                }
                syncforge_monitor::AlertEvent::Resolved(alert) => {
                    info!(alert_id = %alert.id, "alert:resolved: {}", alert.message);
                }
            }
        }
    }

    /// Spawns the periodic sweep loop until `shutdown` fires.
    pub fn start_sweep_loop(
        self: Arc<Self>,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let interval = std::time::Duration::from_millis(self.config.sweep_interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.sweep(now_ms()),
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl EventHandler for Orchestrator {
    /// Drives a drained batch of queued events through `synchronize`
    /// (spec.md §4.6: "Periodically C6 also drains queued updates from
    /// C2"). Only a failed *target dispatch* is reported back as
    /// retryable; validation/conflict/internal failures are terminal for
    /// this event (spec.md §7's propagation policy), so they report
    /// success to stop the queue from retrying them.
    async fn handle(&self, events: Vec<Event>) -> Vec<EventOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            let event_id = event.id;
            let outcome = match self.synchronize(event.update).await {
                Ok(result) => result.success,
                Err(e) => {
                    error!(event_id = %event_id, error = %e, "synchronize failed");
                    !e.is_retryable()
                }
            };
            outcomes.push(EventOutcome { event_id, success: outcome });
        }
        outcomes
    }

    async fn on_dead_letter(&self, event: Event) {
        warn!(event_id = %event.id, entity_id = %event.update.entity_id, "event dead-lettered after exhausting retries");
    }
}

#[async_trait]
impl StatusUpdateSink for Orchestrator {
    /// Where inbound fan-out `status_update` messages land: enqueued
    /// through C2 rather than synchronized inline, so the same
    /// dedup/priority/retry machinery governs both adapter-originated and
    /// client-originated updates.
    async fn accept(&self, update: StatusUpdate) {
        let priority = syncforge_types::EventPriority::Normal;
        if let Err(e) = self.queue.add_event(update, priority) {
            warn!(error = %e, "failed to enqueue inbound status update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncforge_adapter::StubAdapter;
    use syncforge_mapper::MapperConfig;
    use syncforge_monitor::MonitorConfig;
    use syncforge_queue::QueueConfig;
    use syncforge_types::EntityType;

    fn orchestrator_with_escalation_threshold(threshold: usize) -> (Orchestrator, HashMap<System, Arc<StubAdapter>>) {
        let mapper = Arc::new(StatusMapper::new(MapperConfig::default()));
        let queue = Arc::new(EventQueue::new(QueueConfig::default()));
        let detector = Arc::new(ConflictDetector::new(syncforge_conflict::ConflictConfig::default(), mapper.clone()));
        let resolver = Arc::new(ConflictResolver::with_defaults(threshold));
        let monitor = Arc::new(SyncMonitor::new(&MonitorConfig::default()).unwrap());

        let stubs: HashMap<System, Arc<StubAdapter>> =
            System::ALL.into_iter().map(|s| (s, Arc::new(StubAdapter::new(s)))).collect();
        let adapters: HashMap<System, Arc<dyn Adapter>> =
            stubs.iter().map(|(s, a)| (*s, a.clone() as Arc<dyn Adapter>)).collect();

        let orchestrator =
            Orchestrator::new(OrchestratorConfig::default(), mapper, queue, detector, resolver, adapters, monitor);
        (orchestrator, stubs)
    }

    fn orchestrator() -> Orchestrator {
        orchestrator_with_escalation_threshold(3).0
    }

    #[tokio::test]
    async fn happy_path_dispatches_to_all_four_systems() {
        let orchestrator = orchestrator();
        let update = StatusUpdate::new(EntityType::Task, "T1", "Done", System::Tracker);
        let outcome = orchestrator.synchronize(update).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.results.len(), 4);
        assert!(outcome.results.values().all(|r| r.success));
    }

    #[tokio::test]
    async fn partial_dispatch_failure_is_captured_per_system() {
        let (orchestrator, stubs) = orchestrator_with_escalation_threshold(3);
        stubs[&System::Vcs].fail_next_call();

        let update = StatusUpdate::new(EntityType::Task, "T1", "Done", System::Tracker);
        let outcome = orchestrator.synchronize(update).await.unwrap();

        assert!(!outcome.success);
        assert!(!outcome.results[&System::Vcs].success);
        assert!(outcome.results[&System::Relational].success);
    }

    #[tokio::test]
    async fn invalid_transition_is_escalated_as_a_conflict_error() {
        // Lowering the threshold to 1 forces escalation regardless of
        // which strategy would otherwise have applied.
        let (orchestrator, _stubs) = orchestrator_with_escalation_threshold(1);
        let update = StatusUpdate::new(EntityType::Task, "T1", "Done", System::Tracker)
            .with_previous_status("Open");

        let result = orchestrator.synchronize(update).await;
        assert!(matches!(result, Err(OrchestratorError::Conflict(_))));
    }

    #[tokio::test]
    async fn validation_failure_is_not_retryable() {
        let orchestrator = orchestrator();
        let update = StatusUpdate::new(EntityType::Task, "", "Done", System::Tracker);
        let outcomes = orchestrator.handle(vec![Event::new(update, syncforge_types::EventPriority::Normal)]).await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success, "validation failures should not trigger a retry");
    }
}
