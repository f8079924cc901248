use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use syncforge_types::{EventPriority, EventType};

/// Welford's online algorithm for a running mean, used for the per-type
/// average processing time spec.md §4.2 asks for ("Welford-style update").
#[derive(Debug, Clone, Copy, Default)]
struct RunningMean {
    count: u64,
    mean_ms: f64,
}

impl RunningMean {
    fn update(&mut self, sample_ms: f64) {
        self.count += 1;
        let delta = sample_ms - self.mean_ms;
        self.mean_ms += delta / self.count as f64;
    }
}

/// Counters and rolling averages for [`crate::EventQueue`].
#[derive(Debug, Default)]
pub struct QueueMetrics {
    total: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    deduplicated: AtomicU64,
    dead_lettered: AtomicU64,
    per_type_mean: Mutex<HashMap<EventType, RunningMean>>,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self, event_type: EventType, duration_ms: f64) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        let mut map = self.per_type_mean.lock().expect("queue metrics lock poisoned");
        map.entry(event_type).or_default().update(duration_ms);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, queue_depths: [usize; 4]) -> QueueMetricsSnapshot {
        let per_type_avg_ms = self
            .per_type_mean
            .lock()
            .expect("queue metrics lock poisoned")
            .iter()
            .map(|(k, v)| (*k, v.mean_ms))
            .collect();

        QueueMetricsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            per_type_avg_ms,
            queue_depths,
        }
    }
}

/// A point-in-time read of [`QueueMetrics`].
#[derive(Debug, Clone)]
pub struct QueueMetricsSnapshot {
    pub total: u64,
    pub processed: u64,
    pub failed: u64,
    pub retried: u64,
    pub deduplicated: u64,
    pub dead_lettered: u64,
    pub per_type_avg_ms: HashMap<EventType, f64>,
    /// Depth of each of the four priority levels, indexed by
    /// [`EventPriority::as_index`].
    pub queue_depths: [usize; 4],
}

impl QueueMetricsSnapshot {
    pub fn depth_for(&self, priority: EventPriority) -> usize {
        self.queue_depths[priority.as_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_converges_to_average() {
        let mut mean = RunningMean::default();
        for sample in [10.0, 20.0, 30.0] {
            mean.update(sample);
        }
        assert!((mean.mean_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_reports_counters() {
        let metrics = QueueMetrics::new();
        metrics.record_enqueued();
        metrics.record_processed(EventType::StatusUpdate, 5.0);
        metrics.record_deduplicated();
        let snap = metrics.snapshot([1, 0, 0, 0]);
        assert_eq!(snap.total, 1);
        assert_eq!(snap.processed, 1);
        assert_eq!(snap.deduplicated, 1);
        assert_eq!(snap.depth_for(EventPriority::Critical), 1);
    }
}
