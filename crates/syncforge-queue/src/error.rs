use syncforge_types::EventPriority;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors raised by [`crate::EventQueue`] (spec.md §7's "Queue overflow"
/// error kind, surfaced to the caller with no retry).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("priority queue {priority} is full (capacity reached)")]
    QueueFull { priority: EventPriority },

    #[error("queue is stopped")]
    Stopped,
}
