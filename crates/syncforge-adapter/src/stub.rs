use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use syncforge_types::{EntityKey, MappedUpdate, System};

use crate::error::AdapterError;
use crate::{Adapter, ApplyResult, HealthCheck};

/// A trivial in-memory [`Adapter`] used by tests and the demo binary.
/// Records every applied update and can be toggled to fail the next call,
/// which is how the partial-dispatch-failure scenario in spec.md §8 is
/// exercised without a real external system.
pub struct StubAdapter {
    system: System,
    fail_next: AtomicBool,
    applied: Mutex<Vec<ApplyResult>>,
}

impl StubAdapter {
    pub fn new(system: System) -> Self {
        Self {
            system,
            fail_next: AtomicBool::new(false),
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn applied(&self) -> Vec<ApplyResult> {
        self.applied.lock().expect("stub adapter lock poisoned").clone()
    }
}

#[async_trait]
impl Adapter for StubAdapter {
    fn system(&self) -> System {
        self.system
    }

    async fn apply(&self, update: &MappedUpdate) -> Result<ApplyResult, AdapterError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AdapterError::Timeout {
                system: self.system.as_str(),
            });
        }

        let result = ApplyResult {
            system: self.system,
            entity_id: update.entity_id.clone(),
            status: update.status.clone(),
            timestamp: update.timestamp,
        };
        self.applied.lock().expect("stub adapter lock poisoned").push(result.clone());
        Ok(result)
    }

    async fn health_check(&self) -> HealthCheck {
        HealthCheck::healthy()
    }

    async fn incomplete_dependencies(&self, _entity: &EntityKey) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncforge_types::{MappingInfo, Metadata};

    fn update() -> MappedUpdate {
        MappedUpdate {
            entity_id: "T1".into(),
            entity_type: "task".into(),
            status: "completed".into(),
            previous_status: None,
            priority: None,
            source: System::Tracker,
            target: System::Relational,
            timestamp: 0,
            metadata: Metadata::new(),
            mapping_info: MappingInfo {
                original_system: System::Tracker,
                target_system: System::Relational,
                mapped_at: 0,
            },
        }
    }

    #[tokio::test]
    async fn records_applied_updates() {
        let adapter = StubAdapter::new(System::Relational);
        adapter.apply(&update()).await.unwrap();
        assert_eq!(adapter.applied().len(), 1);
    }

    #[tokio::test]
    async fn fail_next_call_fails_exactly_once() {
        let adapter = StubAdapter::new(System::Relational);
        adapter.fail_next_call();
        assert!(adapter.apply(&update()).await.is_err());
        assert!(adapter.apply(&update()).await.is_ok());
    }
}
