use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{update::StatusUpdate, TimestampMs};

/// The four priority levels the queue indexes on; `as usize` gives the 0..=3
/// array index spec.md's §4.2 describes (0 = critical, 3 = low).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Critical = 0,
    High = 1,
    Normal = 2,
    Low = 3,
}

impl EventPriority {
    pub const ALL: [EventPriority; 4] = [
        EventPriority::Critical,
        EventPriority::High,
        EventPriority::Normal,
        EventPriority::Low,
    ];

    pub fn as_index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for EventPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventPriority::Critical => "critical",
            EventPriority::High => "high",
            EventPriority::Normal => "normal",
            EventPriority::Low => "low",
        };
        f.write_str(s)
    }
}

/// The event's kind. Always `"status_update"` today; kept as an enum rather
/// than a bare string so batching-by-type (spec.md §4.2 step 3) has
/// something to group on and future event kinds don't require a schema
/// change at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StatusUpdate,
}

impl Default for EventType {
    fn default() -> Self {
        EventType::StatusUpdate
    }
}

/// What the queue holds: a [`StatusUpdate`] wrapped with queue-lifecycle
/// bookkeeping (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub update: StatusUpdate,
    pub priority: EventPriority,
    pub retry_count: u32,
    pub event_type: EventType,
    pub enqueued_at: TimestampMs,
}

impl Event {
    pub fn new(update: StatusUpdate, priority: EventPriority) -> Self {
        Self {
            id: Uuid::new_v4(),
            update,
            priority,
            retry_count: 0,
            event_type: EventType::StatusUpdate,
            enqueued_at: crate::now_ms(),
        }
    }

    /// Produces the requeued copy after a failed dispatch: same id and
    /// payload, `retry_count` incremented, re-stamped `enqueued_at` so FIFO
    /// ordering within the priority level reflects the requeue time, not the
    /// original arrival.
    pub fn into_retry(mut self) -> Self {
        self.retry_count += 1;
        self.enqueued_at = crate::now_ms();
        self
    }
}
