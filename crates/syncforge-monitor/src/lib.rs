//! # syncforge-monitor
//!
//! The Sync Monitor (C7): counters, timers, health roll-up, and threshold
//! alerts (spec.md §4.7). In-memory only — exporting to an external
//! dashboard is out of scope (spec.md §1's Non-goals), though the
//! `prometheus`-backed `/metrics` text rendering this crate exposes is the
//! ambient instrumentation surface `syncforge-server` serves, matching how
//! `kimberlite-server` depends on `prometheus` directly.

mod alerts;
mod config;
mod error;
mod health;
mod metrics;

pub use alerts::{Alert, AlertEngine, AlertEvent, AlertSeverity, Thresholds};
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use health::HealthMonitor;
pub use metrics::{MetricsSnapshot, SyncMetrics};

use std::sync::Arc;

/// Facade wiring [`SyncMetrics`] and [`AlertEngine`] together, the unit
/// the Orchestrator (C6) holds and calls on every `synchronize` and on its
/// periodic tick.
pub struct SyncMonitor {
    pub metrics: Arc<SyncMetrics>,
    pub alerts: Arc<AlertEngine>,
}

impl SyncMonitor {
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        Ok(Self {
            metrics: Arc::new(SyncMetrics::new()?),
            alerts: Arc::new(AlertEngine::new(config.thresholds.clone())),
        })
    }

    /// Records a completed `synchronize` call's outcome.
    pub fn record_sync(&self, success: bool, duration_ms: f64) {
        self.metrics.record_sync(success, duration_ms);
    }

    pub fn record_queue_depth(&self, depth: usize) {
        self.metrics.record_queue_depth(depth);
    }

    pub fn record_conflict_detected(&self) {
        self.metrics.record_conflict_detected();
    }

    pub fn record_conflict_resolved(&self) {
        self.metrics.record_conflict_resolved();
    }

    pub fn record_conflict_escalated(&self) {
        self.metrics.record_conflict_escalated();
    }

    /// Re-evaluates thresholds against the current snapshot, returning any
    /// alert transitions. Intended to be called on the monitor's own tick
    /// interval ([`MonitorConfig::tick_interval_ms`]).
    pub fn tick(&self) -> Vec<AlertEvent> {
        self.alerts.evaluate(&self.metrics.snapshot())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts.active_alerts()
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String> {
        self.metrics.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_raises_alert_from_recorded_failures() {
        let monitor = SyncMonitor::new(&MonitorConfig {
            thresholds: Thresholds { failure_rate: 0.1, ..Thresholds::default() },
            ..MonitorConfig::default()
        })
        .unwrap();
        for _ in 0..9 {
            monitor.record_sync(true, 1.0);
        }
        monitor.record_sync(false, 1.0);
        let events = monitor.tick();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AlertEvent::Raised(_)));
    }
}
