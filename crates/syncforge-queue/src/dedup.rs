use std::collections::HashMap;
use std::sync::Mutex;

use syncforge_types::TimestampMs;

/// The recent-events table spec.md §4.2 describes: keyed on
/// `entityType:entityId:status:source`, entries older than `window_ms` are
/// ignored by `is_duplicate` and removed by the periodic `sweep`.
pub struct DedupWindow {
    window_ms: i64,
    seen: Mutex<HashMap<String, TimestampMs>>,
}

impl DedupWindow {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Checks `key` against the table and, if it is not a live duplicate,
    /// records `now` for it. Returns `true` if `key` was a duplicate (and
    /// should be rejected).
    pub fn check_and_insert(&self, key: &str, now: TimestampMs) -> bool {
        let mut seen = self.seen.lock().expect("dedup lock poisoned");
        if let Some(&seen_at) = seen.get(key) {
            if now - seen_at <= self.window_ms {
                return true;
            }
        }
        seen.insert(key.to_string(), now);
        false
    }

    /// Evicts entries older than `window_ms`. Intended to run on a
    /// background timer so the table doesn't grow unbounded.
    pub fn sweep(&self, now: TimestampMs) -> usize {
        let mut seen = self.seen.lock().expect("dedup lock poisoned");
        let before = seen.len();
        seen.retain(|_, &mut seen_at| now - seen_at <= self.window_ms);
        before - seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("dedup lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_within_window() {
        let dedup = DedupWindow::new(100);
        assert!(!dedup.check_and_insert("k", 0));
        assert!(dedup.check_and_insert("k", 50));
    }

    #[test]
    fn allows_repeat_after_window_elapses() {
        let dedup = DedupWindow::new(100);
        assert!(!dedup.check_and_insert("k", 0));
        assert!(!dedup.check_and_insert("k", 200));
    }

    #[test]
    fn sweep_evicts_stale_entries() {
        let dedup = DedupWindow::new(100);
        dedup.check_and_insert("a", 0);
        dedup.check_and_insert("b", 90);
        let evicted = dedup.sweep(200);
        assert_eq!(evicted, 1);
        assert_eq!(dedup.len(), 1);
    }
}
