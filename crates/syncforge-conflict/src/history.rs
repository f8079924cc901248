use std::collections::HashMap;
use std::sync::Mutex;

use syncforge_types::{EntityType, StatusUpdate, TimestampMs};

/// A previously-accepted update, kept only long enough to detect a
/// concurrent write landing within the same window (spec.md §4.3(1)).
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub status: String,
    pub source: syncforge_types::System,
    pub timestamp: TimestampMs,
}

fn entity_key(entity_type: EntityType, entity_id: &str) -> String {
    format!("{entity_type}:{entity_id}")
}

/// Bounded per-entity history of recently-accepted updates.
///
/// Grounded on the dedup window in `syncforge-queue`'s `DedupWindow`: same
/// shape (a `Mutex<HashMap<String, _>>` keyed by a composite string,
/// swept on a timer), reused here for concurrent-update detection instead
/// of duplicate suppression.
pub struct ConflictHistory {
    window_ms: i64,
    entries: Mutex<HashMap<String, HistoryEntry>>,
}

impl ConflictHistory {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the prior entry for this entity if it is still within the
    /// concurrent-update window, then records `update` as the new most
    /// recent entry regardless.
    pub fn record_and_check(&self, update: &StatusUpdate) -> Option<HistoryEntry> {
        let key = entity_key(update.entity_type, &update.entity_id);
        let mut entries = self.entries.lock().expect("conflict history lock poisoned");
        let prior = entries.get(&key).cloned().filter(|prev| {
            update.timestamp.saturating_sub(prev.timestamp) <= self.window_ms
                && prev.source != update.source
        });
        entries.insert(
            key,
            HistoryEntry {
                status: update.status.clone(),
                source: update.source,
                timestamp: update.timestamp,
            },
        );
        prior
    }

    /// Drops entries older than `window_ms`, called on the orchestrator's
    /// periodic sweep alongside the queue's own dedup sweep.
    pub fn sweep(&self, now: TimestampMs) {
        let mut entries = self.entries.lock().expect("conflict history lock poisoned");
        entries.retain(|_, entry| now.saturating_sub(entry.timestamp) <= self.window_ms);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("conflict history lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncforge_types::System;

    fn update(entity_id: &str, status: &str, source: System, ts: i64) -> StatusUpdate {
        let mut u = StatusUpdate::new(EntityType::Task, entity_id, status, source);
        u.timestamp = ts;
        u
    }

    #[test]
    fn no_conflict_on_first_write() {
        let history = ConflictHistory::new(5_000);
        let prior = history.record_and_check(&update("T1", "pending", System::Tracker, 0));
        assert!(prior.is_none());
    }

    #[test]
    fn detects_concurrent_write_from_different_source_within_window() {
        let history = ConflictHistory::new(5_000);
        history.record_and_check(&update("T1", "pending", System::Tracker, 0));
        let prior = history.record_and_check(&update("T1", "in_progress", System::Vcs, 1_000));
        assert!(prior.is_some());
    }

    #[test]
    fn no_conflict_from_same_source() {
        let history = ConflictHistory::new(5_000);
        history.record_and_check(&update("T1", "pending", System::Tracker, 0));
        let prior = history.record_and_check(&update("T1", "in_progress", System::Tracker, 1_000));
        assert!(prior.is_none());
    }

    #[test]
    fn no_conflict_outside_window() {
        let history = ConflictHistory::new(5_000);
        history.record_and_check(&update("T1", "pending", System::Tracker, 0));
        let prior = history.record_and_check(&update("T1", "in_progress", System::Vcs, 10_000));
        assert!(prior.is_none());
    }

    #[test]
    fn sweep_evicts_stale_entries() {
        let history = ConflictHistory::new(1_000);
        history.record_and_check(&update("T1", "pending", System::Tracker, 0));
        history.sweep(5_000);
        assert!(history.is_empty());
    }
}
