//! # syncforge-queue
//!
//! Priority event queue / processor (C2): dedup, batched draining, ordered
//! processing within a batch, and per-event retry with exponential
//! backoff. See spec.md §4.2.

mod dedup;
mod error;
mod metrics;
mod priority_queue;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use syncforge_types::{now_ms, Event, EventPriority, EventType, StatusUpdate, TimestampMs};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

pub use dedup::DedupWindow;
pub use error::{QueueError, Result};
pub use metrics::{QueueMetrics, QueueMetricsSnapshot};
pub use priority_queue::PriorityQueue;

/// The outcome the orchestrator reports back for one dispatched event.
#[derive(Debug, Clone)]
pub struct EventOutcome {
    pub event_id: Uuid,
    pub success: bool,
}

/// Receives drained batches from [`EventQueue`]. Implemented by the
/// orchestrator; kept as a trait (rather than the source's event-emitter
/// callback) per spec.md §9's "typed broadcast channels / explicit
/// interface" redesign note.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one group of events (a single event when batching is
    /// disabled, or a same-`event_type` group when it's enabled) and
    /// reports per-event success/failure.
    async fn handle(&self, events: Vec<Event>) -> Vec<EventOutcome>;

    /// Called once for every event that exceeded `max_retries` and was
    /// dead-lettered (spec.md §4.2's `maxRetriesExceeded`).
    async fn on_dead_letter(&self, _event: Event) {}
}

/// Tunables for [`EventQueue`] (spec.md §6 "Queue" configuration group).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity_per_level: usize,
    pub dedup_window_ms: i64,
    pub batch_size: usize,
    pub processing_interval: Duration,
    pub enable_batching: bool,
    pub enable_ordering: bool,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity_per_level: 10_000,
            dedup_window_ms: 60_000,
            batch_size: 50,
            processing_interval: Duration::from_millis(100),
            enable_batching: true,
            enable_ordering: true,
            max_retries: 5,
            retry_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
        }
    }
}

/// The event queue / processor (component C2).
pub struct EventQueue {
    config: QueueConfig,
    queue: PriorityQueue,
    dedup: DedupWindow,
    metrics: QueueMetrics,
    stopped: AtomicBool,
    dead_letters: std::sync::Mutex<std::collections::VecDeque<Event>>,
    dead_letter_capacity: usize,
}

impl EventQueue {
    pub fn new(config: QueueConfig) -> Self {
        let dedup = DedupWindow::new(config.dedup_window_ms);
        let queue = PriorityQueue::new(config.capacity_per_level);
        Self {
            dead_letter_capacity: config.capacity_per_level.min(1000),
            config,
            queue,
            dedup,
            metrics: QueueMetrics::new(),
            stopped: AtomicBool::new(false),
            dead_letters: std::sync::Mutex::new(std::collections::VecDeque::new()),
        }
    }

    /// Enqueues `update` at `priority`. Returns `Ok(None)` when the update
    /// was rejected as a duplicate (spec.md §4.2's "fails with `QueueFull`"
    /// contract, plus the dedup nil-return).
    pub fn add_event(&self, update: StatusUpdate, priority: EventPriority) -> Result<Option<Uuid>> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(QueueError::Stopped);
        }

        let now = now_ms();
        let key = update.dedup_key();
        if self.dedup.check_and_insert(&key, now) {
            self.metrics.record_deduplicated();
            return Ok(None);
        }

        let event = Event::new(update, priority);
        let id = event.id;
        self.metrics.record_enqueued();
        self.queue.push_back(event).map_err(|event| QueueError::QueueFull { priority: event.priority })?;
        Ok(Some(id))
    }

    pub fn metrics_snapshot(&self) -> QueueMetricsSnapshot {
        self.metrics.snapshot(self.queue.depths())
    }

    /// Evicts entries from the dedup window older than `dedup_window_ms`
    /// (spec.md §4.2's background sweep). Intended to run on the
    /// orchestrator's periodic sweep alongside the conflict detector's own
    /// sweep, so the dedup table doesn't grow unbounded in a long-running
    /// server.
    pub fn sweep(&self, now: TimestampMs) -> usize {
        self.dedup.sweep(now)
    }

    pub fn dead_letters(&self) -> Vec<Event> {
        self.dead_letters.lock().expect("dead letter lock poisoned").iter().cloned().collect()
    }

    fn record_dead_letter(&self, event: Event) {
        self.metrics.record_dead_lettered();
        let mut dl = self.dead_letters.lock().expect("dead letter lock poisoned");
        if dl.len() >= self.dead_letter_capacity {
            dl.pop_front();
        }
        dl.push_back(event);
    }

    /// One drain tick: pop up to `batch_size` events (priority first, FIFO
    /// within a level), optionally re-sort by `enqueued_at`, optionally
    /// group by `event_type`, and hand each group to `handler`. Outcomes
    /// drive retry/dead-letter bookkeeping.
    async fn tick(self: &Arc<Self>, handler: &Arc<dyn EventHandler>) {
        let mut batch = self.queue.drain_batch(self.config.batch_size);
        if batch.is_empty() {
            return;
        }

        if self.config.enable_ordering {
            batch.sort_by_key(|e| e.enqueued_at);
        }

        let groups: Vec<Vec<Event>> = if self.config.enable_batching && batch.len() > 1 {
            group_by_type(batch)
        } else {
            batch.into_iter().map(|e| vec![e]).collect()
        };

        for group in groups {
            let by_id: HashMap<Uuid, Event> = group.iter().map(|e| (e.id, e.clone())).collect();
            let outcomes = handler.handle(group).await;
            for outcome in outcomes {
                let Some(event) = by_id.get(&outcome.event_id).cloned() else {
                    continue;
                };
                if outcome.success {
                    self.metrics.record_processed(event.event_type, (now_ms() - event.enqueued_at) as f64);
                } else {
                    self.handle_failure(handler, event).await;
                }
            }
        }
    }

    async fn handle_failure(self: &Arc<Self>, handler: &Arc<dyn EventHandler>, event: Event) {
        self.metrics.record_failed();
        if event.retry_count >= self.config.max_retries {
            warn!(event_id = %event.id, retries = event.retry_count, "max retries exceeded, dead-lettering");
            self.record_dead_letter(event.clone());
            handler.on_dead_letter(event).await;
            return;
        }

        self.metrics.record_retried();
        let retried = event.into_retry();
        let delay = Duration::from_secs_f64(
            self.config.retry_delay.as_secs_f64() * self.config.backoff_multiplier.powi(retried.retry_count as i32),
        );

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.queue.push_front(retried);
        });
    }

    /// Spawns the drain loop. Returns a handle the caller can `.await` after
    /// calling [`EventQueue::stop`].
    pub fn start(self: Arc<Self>, handler: Arc<dyn EventHandler>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.processing_interval);
            loop {
                interval.tick().await;
                if self.stopped.load(Ordering::Acquire) && self.queue.is_empty() {
                    break;
                }
                self.tick(&handler).await;
            }
            info!("event queue drain loop stopped");
        })
    }

    /// Signals the drain loop to stop and waits up to `grace` for the
    /// queue to empty (spec.md §4.2: "`stop()` drains remaining events
    /// under a finite grace budget").
    pub async fn stop(&self, grace: Duration) {
        self.stopped.store(true, Ordering::Release);
        let deadline = tokio::time::Instant::now() + grace;
        while !self.queue.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

fn group_by_type(events: Vec<Event>) -> Vec<Vec<Event>> {
    let mut order: Vec<EventType> = Vec::new();
    let mut groups: HashMap<EventType, Vec<Event>> = HashMap::new();
    for event in events {
        let ty = event.event_type;
        if !groups.contains_key(&ty) {
            order.push(ty);
        }
        groups.entry(ty).or_default().push(event);
    }
    order.into_iter().map(|ty| groups.remove(&ty).unwrap()).collect()
}
