use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use syncforge_types::{now_ms, TimestampMs};

use crate::metrics::MetricsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// A raised threshold breach (spec.md §4.7: `Alert{id, severity, message,
/// raisedAt}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub severity: AlertSeverity,
    pub message: String,
    pub raised_at: TimestampMs,
}

/// Which threshold a tracked alert corresponds to, used as the key an
/// alert is raised and auto-resolved under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ThresholdKind {
    FailureRate,
    AvgSyncTime,
    QueueSize,
    ConflictRate,
    AdapterHealth(String),
}

/// Tunable thresholds compared each tick (spec.md §4.7).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub failure_rate: f64,
    pub avg_sync_time_ms: f64,
    pub queue_size: usize,
    pub conflict_rate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            failure_rate: 0.1,
            avg_sync_time_ms: 5_000.0,
            queue_size: 1_000,
            conflict_rate: 0.2,
        }
    }
}

/// Raises and auto-resolves [`Alert`]s against [`Thresholds`]. Each
/// threshold (and each monitored adapter's health) tracks at most one
/// active alert at a time; re-entering bounds clears it (spec.md §4.7:
/// "resolved automatically when the metric re-enters bounds").
pub struct AlertEngine {
    thresholds: Thresholds,
    active: Mutex<HashMap<ThresholdKind, Alert>>,
}

/// Whether evaluating a tick raised, resolved, or left a threshold alone.
#[derive(Debug, Clone)]
pub enum AlertEvent {
    Raised(Alert),
    Resolved(Alert),
}

impl AlertEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds, active: Mutex::new(HashMap::new()) }
    }

    /// Compares `snapshot` against the configured thresholds, raising or
    /// resolving alerts as needed. Returns the set of transitions that
    /// occurred this tick (empty if nothing changed).
    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        self.check(
            ThresholdKind::FailureRate,
            snapshot.failure_rate > self.thresholds.failure_rate,
            || format!("failure rate {:.1}% exceeds threshold {:.1}%", snapshot.failure_rate * 100.0, self.thresholds.failure_rate * 100.0),
            AlertSeverity::Critical,
            &mut events,
        );
        self.check(
            ThresholdKind::AvgSyncTime,
            snapshot.avg_sync_duration_ms > self.thresholds.avg_sync_time_ms,
            || format!("average sync duration {:.0}ms exceeds threshold {:.0}ms", snapshot.avg_sync_duration_ms, self.thresholds.avg_sync_time_ms),
            AlertSeverity::Warning,
            &mut events,
        );
        self.check(
            ThresholdKind::QueueSize,
            snapshot.queue_depth > self.thresholds.queue_size,
            || format!("queue depth {} exceeds threshold {}", snapshot.queue_depth, self.thresholds.queue_size),
            AlertSeverity::Warning,
            &mut events,
        );
        self.check(
            ThresholdKind::ConflictRate,
            snapshot.conflict_rate > self.thresholds.conflict_rate,
            || format!("conflict rate {:.1}% exceeds threshold {:.1}%", snapshot.conflict_rate * 100.0, self.thresholds.conflict_rate * 100.0),
            AlertSeverity::Warning,
            &mut events,
        );
        events
    }

    /// Feeds an unhealthy adapter into the same breach/resolve machinery
    /// under a per-system key (the health-check roll-up SPEC_FULL.md
    /// adds: spec.md §6's `healthCheck()` polled on a timer).
    pub fn report_adapter_health(&self, system: &str, healthy: bool, detail: Option<&str>) -> Option<AlertEvent> {
        let kind = ThresholdKind::AdapterHealth(system.to_string());
        let message = || match detail {
            Some(detail) => format!("adapter {system} unhealthy: {detail}"),
            None => format!("adapter {system} unhealthy"),
        };
        let mut events = Vec::new();
        self.check(kind, !healthy, message, AlertSeverity::Critical, &mut events);
        events.into_iter().next()
    }

    fn check(
        &self,
        kind: ThresholdKind,
        breached: bool,
        message: impl FnOnce() -> String,
        severity: AlertSeverity,
        events: &mut Vec<AlertEvent>,
    ) {
        let mut active = self.active.lock().expect("alert engine lock poisoned");
        match (breached, active.get(&kind)) {
            (true, None) => {
                let alert = Alert { id: Uuid::new_v4(), severity, message: message(), raised_at: now_ms() };
                active.insert(kind, alert.clone());
                events.push(AlertEvent::Raised(alert));
            }
            (false, Some(_)) => {
                if let Some(alert) = active.remove(&kind) {
                    events.push(AlertEvent::Resolved(alert));
                }
            }
            _ => {}
        }
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.active.lock().expect("alert engine lock poisoned").values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(failure_rate: f64, avg_ms: f64, queue_depth: usize, conflict_rate: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            total_syncs: 10,
            successful_syncs: 9,
            failed_syncs: 1,
            failure_rate,
            avg_sync_duration_ms: avg_ms,
            queue_depth,
            conflicts_detected: 0,
            conflicts_resolved: 0,
            conflicts_escalated: 0,
            conflict_rate,
        }
    }

    #[test]
    fn raises_alert_on_breach_and_resolves_on_recovery() {
        let engine = AlertEngine::new(Thresholds::default());
        let events = engine.evaluate(&snapshot(0.5, 100.0, 1, 0.0));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AlertEvent::Raised(_)));
        assert_eq!(engine.active_alerts().len(), 1);

        let events = engine.evaluate(&snapshot(0.01, 100.0, 1, 0.0));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AlertEvent::Resolved(_)));
        assert!(engine.active_alerts().is_empty());
    }

    #[test]
    fn does_not_re_raise_while_still_breached() {
        let engine = AlertEngine::new(Thresholds::default());
        engine.evaluate(&snapshot(0.5, 100.0, 1, 0.0));
        let events = engine.evaluate(&snapshot(0.6, 100.0, 1, 0.0));
        assert!(events.is_empty());
    }

    #[test]
    fn adapter_health_raises_under_its_own_system_key() {
        let engine = AlertEngine::new(Thresholds::default());
        let event = engine.report_adapter_health("vcs", false, Some("timeout"));
        assert!(matches!(event, Some(AlertEvent::Raised(_))));
        assert_eq!(engine.active_alerts().len(), 1);

        let event = engine.report_adapter_health("vcs", true, None);
        assert!(matches!(event, Some(AlertEvent::Resolved(_))));
    }
}
