use std::sync::Arc;

use syncforge_types::StatusUpdate;

/// A business-rule predicate (spec.md §4.3(4)): a named check over a
/// candidate update that either accepts it or names the violated rule.
///
/// Modeled as a boxed closure rather than a trait object hierarchy because
/// spec.md's examples ("a deployment cannot complete while its linked PR
/// is still in review") are one-shot predicates over the update alone,
/// with no further lifecycle a trait would buy.
#[derive(Clone)]
pub struct BusinessRule {
    name: String,
    check: Arc<dyn Fn(&StatusUpdate) -> Result<(), String> + Send + Sync>,
}

impl BusinessRule {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&StatusUpdate) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the rule, returning `Err(reason)` when it is violated.
    pub fn evaluate(&self, update: &StatusUpdate) -> Result<(), String> {
        (self.check)(update)
    }
}

impl std::fmt::Debug for BusinessRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusinessRule").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncforge_types::{EntityType, System};

    #[test]
    fn evaluates_violation() {
        let rule = BusinessRule::new("no_direct_completion", |u: &StatusUpdate| {
            if u.status == "completed" && u.previous_status.is_none() {
                Err("cannot complete without a prior status".to_string())
            } else {
                Ok(())
            }
        });
        let update = StatusUpdate::new(EntityType::Task, "T1", "completed", System::Tracker);
        assert!(rule.evaluate(&update).is_err());
    }

    #[test]
    fn evaluates_pass() {
        let rule = BusinessRule::new("always_ok", |_: &StatusUpdate| Ok(()));
        let update = StatusUpdate::new(EntityType::Task, "T1", "pending", System::Tracker);
        assert!(rule.evaluate(&update).is_ok());
    }
}
