use std::sync::Arc;
use std::time::Duration;

use syncforge_adapter::{Adapter, HealthStatus};
use tracing::{info, warn};

use crate::alerts::{AlertEngine, AlertEvent};

/// Polls every registered adapter's `health_check()` (spec.md §6) on a
/// timer and feeds the result into [`AlertEngine`] under a per-system key
/// — the health-check roll-up SPEC_FULL.md's ambient-observability section
/// adds on top of spec.md's named counters.
pub struct HealthMonitor {
    adapters: Vec<Arc<dyn Adapter>>,
    alerts: Arc<AlertEngine>,
}

impl HealthMonitor {
    pub fn new(adapters: Vec<Arc<dyn Adapter>>, alerts: Arc<AlertEngine>) -> Self {
        Self { adapters, alerts }
    }

    /// Polls every adapter once, returning any alert transitions this
    /// round produced.
    pub async fn poll_once(&self) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        for adapter in &self.adapters {
            let check = adapter.health_check().await;
            let system = adapter.system().as_str();
            let healthy = check.status == HealthStatus::Healthy;
            if !healthy {
                warn!(system, status = ?check.status, detail = ?check.detail, "adapter:unhealthy");
            }
            if let Some(event) = self.alerts.report_adapter_health(system, healthy, check.detail.as_deref()) {
                events.push(event);
            }
        }
        events
    }

    /// Runs [`Self::poll_once`] on a fixed interval until cancelled.
    /// Intended to be spawned as its own task by the orchestrator, the way
    /// spec.md §5 describes each long-lived loop owning a task.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("health monitor: shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use syncforge_types::{EntityKey, MappedUpdate, System};
    use syncforge_adapter::{ApplyResult, AdapterError, HealthCheck};

    struct FlakyAdapter;

    #[async_trait]
    impl Adapter for FlakyAdapter {
        fn system(&self) -> System {
            System::Vcs
        }

        async fn apply(&self, _update: &MappedUpdate) -> Result<ApplyResult, AdapterError> {
            unimplemented!()
        }

        async fn health_check(&self) -> HealthCheck {
            HealthCheck::unhealthy("connection refused")
        }

        async fn incomplete_dependencies(&self, _entity: &EntityKey) -> Vec<String> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn poll_once_raises_alert_for_unhealthy_adapter() {
        let alerts = Arc::new(AlertEngine::new(crate::alerts::Thresholds::default()));
        let monitor = HealthMonitor::new(vec![Arc::new(FlakyAdapter)], alerts.clone());
        let events = monitor.poll_once().await;
        assert_eq!(events.len(), 1);
        assert_eq!(alerts.active_alerts().len(), 1);
    }
}
