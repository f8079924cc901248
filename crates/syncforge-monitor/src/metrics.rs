use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};

use crate::error::{MonitorError, Result};

/// Welford's online algorithm for a running mean, mirroring
/// `syncforge-queue`'s metrics module for the same "average sync duration"
/// shape spec.md §4.7 asks for.
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

/// In-memory counters and rolling averages for C7 (spec.md §4.7), paired
/// with a `prometheus` registry exposing the same values for the
/// `/metrics` sidecar endpoint `syncforge-server` wires (the ambient
/// "metrics surface" SPEC_FULL.md adds; export to an external system is
/// out of scope per spec.md §1).
pub struct SyncMetrics {
    registry: Registry,

    total_syncs: IntCounter,
    successful_syncs: IntCounter,
    failed_syncs: IntCounter,
    conflicts_detected: IntCounter,
    conflicts_resolved: IntCounter,
    conflicts_escalated: IntCounter,
    queue_depth_gauge: IntGauge,
    sync_duration_histogram: Histogram,

    running_mean: Mutex<RunningMean>,
    queue_depth_last: AtomicI64,
    conflicts_detected_raw: AtomicU64,
    conflicts_resolved_raw: AtomicU64,
    conflicts_escalated_raw: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let total_syncs = IntCounter::with_opts(Opts::new(
            "syncforge_total_syncs",
            "Total synchronize() calls accepted",
        ))
        .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;
        let successful_syncs = IntCounter::with_opts(Opts::new(
            "syncforge_successful_syncs",
            "synchronize() calls where every target dispatch succeeded",
        ))
        .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;
        let failed_syncs = IntCounter::with_opts(Opts::new(
            "syncforge_failed_syncs",
            "synchronize() calls with at least one failed target dispatch",
        ))
        .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;
        let conflicts_detected = IntCounter::with_opts(Opts::new(
            "syncforge_conflicts_detected_total",
            "Conflicts detected by C3",
        ))
        .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;
        let conflicts_resolved = IntCounter::with_opts(Opts::new(
            "syncforge_conflicts_resolved_total",
            "Conflicts resolved automatically",
        ))
        .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;
        let conflicts_escalated = IntCounter::with_opts(Opts::new(
            "syncforge_conflicts_escalated_total",
            "Conflicts escalated for manual resolution",
        ))
        .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;
        let queue_depth_gauge = IntGauge::with_opts(Opts::new(
            "syncforge_queue_depth",
            "Most recently observed total queue depth across all priorities",
        ))
        .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;
        let sync_duration_histogram = Histogram::with_opts(HistogramOpts::new(
            "syncforge_sync_duration_ms",
            "Duration of synchronize() calls in milliseconds",
        ))
        .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;

        for metric in [
            Box::new(total_syncs.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(successful_syncs.clone()),
            Box::new(failed_syncs.clone()),
            Box::new(conflicts_detected.clone()),
            Box::new(conflicts_resolved.clone()),
            Box::new(conflicts_escalated.clone()),
            Box::new(queue_depth_gauge.clone()),
            Box::new(sync_duration_histogram.clone()),
        ] {
            registry
                .register(metric)
                .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;
        }

        Ok(Self {
            registry,
            total_syncs,
            successful_syncs,
            failed_syncs,
            conflicts_detected,
            conflicts_resolved,
            conflicts_escalated,
            queue_depth_gauge,
            sync_duration_histogram,
            running_mean: Mutex::new(RunningMean::default()),
            queue_depth_last: AtomicI64::new(0),
            conflicts_detected_raw: AtomicU64::new(0),
            conflicts_resolved_raw: AtomicU64::new(0),
            conflicts_escalated_raw: AtomicU64::new(0),
        })
    }

    /// The `prometheus` registry backing this monitor's `/metrics`
    /// sidecar route.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_sync(&self, success: bool, duration_ms: f64) {
        self.total_syncs.inc();
        if success {
            self.successful_syncs.inc();
        } else {
            self.failed_syncs.inc();
        }
        self.sync_duration_histogram.observe(duration_ms);
        self.running_mean.lock().expect("monitor running-mean lock poisoned").update(duration_ms);
    }

    pub fn record_queue_depth(&self, depth: usize) {
        self.queue_depth_gauge.set(depth as i64);
        self.queue_depth_last.store(depth as i64, Ordering::Relaxed);
    }

    pub fn record_conflict_detected(&self) {
        self.conflicts_detected.inc();
        self.conflicts_detected_raw.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict_resolved(&self) {
        self.conflicts_resolved.inc();
        self.conflicts_resolved_raw.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict_escalated(&self) {
        self.conflicts_escalated.inc();
        self.conflicts_escalated_raw.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_syncs.get();
        let successful = self.successful_syncs.get();
        let failed = self.failed_syncs.get();
        let conflicts_detected = self.conflicts_detected_raw.load(Ordering::Relaxed);
        let conflicts_resolved = self.conflicts_resolved_raw.load(Ordering::Relaxed);
        let conflicts_escalated = self.conflicts_escalated_raw.load(Ordering::Relaxed);
        let avg_sync_duration_ms = self.running_mean.lock().expect("monitor running-mean lock poisoned").mean_ms;

        MetricsSnapshot {
            total_syncs: total,
            successful_syncs: successful,
            failed_syncs: failed,
            failure_rate: if total == 0 { 0.0 } else { failed as f64 / total as f64 },
            avg_sync_duration_ms,
            queue_depth: self.queue_depth_last.load(Ordering::Relaxed) as usize,
            conflicts_detected,
            conflicts_resolved,
            conflicts_escalated,
            conflict_rate: if total == 0 { 0.0 } else { conflicts_detected as f64 / total as f64 },
        }
    }

    /// Renders the registry in Prometheus text exposition format, for the
    /// `GET /metrics` sidecar route `syncforge-server` serves (mirroring
    /// `kimberlite-server`'s `/metrics` convention).
    pub fn render(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(|e| MonitorError::RegistrationFailed(e.to_string()))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new().expect("default prometheus metric registration cannot fail")
    }
}

/// A point-in-time read of [`SyncMetrics`], the shape [`crate::alerts::AlertEngine`]
/// evaluates thresholds against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub failure_rate: f64,
    pub avg_sync_duration_ms: f64,
    pub queue_depth: usize,
    pub conflicts_detected: u64,
    pub conflicts_resolved: u64,
    pub conflicts_escalated: u64,
    pub conflict_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_successes_and_failures() {
        let metrics = SyncMetrics::new().unwrap();
        metrics.record_sync(true, 10.0);
        metrics.record_sync(false, 20.0);
        let snap = metrics.snapshot();
        assert_eq!(snap.total_syncs, 2);
        assert_eq!(snap.successful_syncs, 1);
        assert_eq!(snap.failed_syncs, 1);
        assert!((snap.failure_rate - 0.5).abs() < 1e-9);
        assert!((snap.avg_sync_duration_ms - 15.0).abs() < 1e-9);
    }

    #[test]
    fn queue_depth_reflects_last_sample() {
        let metrics = SyncMetrics::new().unwrap();
        metrics.record_queue_depth(3);
        metrics.record_queue_depth(7);
        assert_eq!(metrics.snapshot().queue_depth, 7);
    }

    #[test]
    fn render_produces_prometheus_text_format() {
        let metrics = SyncMetrics::new().unwrap();
        metrics.record_sync(true, 5.0);
        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("syncforge_total_syncs"));
    }
}
