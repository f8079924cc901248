use std::collections::VecDeque;
use std::sync::Mutex;

use syncforge_types::{Event, EventPriority};

/// Four FIFO queues indexed by priority (spec.md §4.2). Each level has its
/// own mutex and its own capacity — "QueueFull" is scoped to the priority
/// level that overflowed, not the queue as a whole.
pub struct PriorityQueue {
    levels: [Mutex<VecDeque<Event>>; 4],
    capacity_per_level: usize,
}

impl PriorityQueue {
    pub fn new(capacity_per_level: usize) -> Self {
        Self {
            levels: std::array::from_fn(|_| Mutex::new(VecDeque::new())),
            capacity_per_level,
        }
    }

    fn level(&self, priority: EventPriority) -> &Mutex<VecDeque<Event>> {
        &self.levels[priority.as_index()]
    }

    /// Enqueues at the back of `event.priority`'s level. Returns the event
    /// back to the caller if that level is at capacity.
    pub fn push_back(&self, event: Event) -> Result<(), Event> {
        let mut level = self.level(event.priority).lock().expect("queue level lock poisoned");
        if level.len() >= self.capacity_per_level {
            return Err(event);
        }
        level.push_back(event);
        Ok(())
    }

    /// Re-enqueues a retried event at the *front* of its level, per
    /// spec.md §4.2's retry rule. A level that is momentarily over capacity
    /// from a retry storm still accepts the retry: backpressure applies to
    /// new work, not to work already admitted.
    pub fn push_front(&self, event: Event) {
        let mut level = self.level(event.priority).lock().expect("queue level lock poisoned");
        level.push_front(event);
    }

    /// Drains up to `max` events, strictly higher priority first, FIFO
    /// within a level (spec.md §4.2 step 1).
    pub fn drain_batch(&self, max: usize) -> Vec<Event> {
        let mut batch = Vec::with_capacity(max);
        for priority in EventPriority::ALL {
            if batch.len() >= max {
                break;
            }
            let mut level = self.level(priority).lock().expect("queue level lock poisoned");
            while batch.len() < max {
                match level.pop_front() {
                    Some(event) => batch.push(event),
                    None => break,
                }
            }
        }
        batch
    }

    /// Depth of each priority level, indexed by [`EventPriority::as_index`].
    pub fn depths(&self) -> [usize; 4] {
        let mut out = [0usize; 4];
        for priority in EventPriority::ALL {
            out[priority.as_index()] = self.level(priority).lock().expect("queue level lock poisoned").len();
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.depths().iter().all(|&d| d == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncforge_types::{EntityType, StatusUpdate, System};

    fn event(priority: EventPriority) -> Event {
        let update = StatusUpdate::new(EntityType::Task, "T1", "pending", System::Tracker);
        Event::new(update, priority)
    }

    #[test]
    fn drains_higher_priority_before_lower() {
        let q = PriorityQueue::new(100);
        for _ in 0..10 {
            q.push_back(event(EventPriority::Low)).unwrap();
        }
        q.push_back(event(EventPriority::Critical)).unwrap();

        let batch = q.drain_batch(1);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].priority, EventPriority::Critical);
    }

    #[test]
    fn fifo_within_a_level() {
        let q = PriorityQueue::new(100);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let e = event(EventPriority::Normal);
            ids.push(e.id);
            q.push_back(e).unwrap();
        }
        let batch = q.drain_batch(3);
        assert_eq!(batch.iter().map(|e| e.id).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn full_level_rejects_push() {
        let q = PriorityQueue::new(1);
        q.push_back(event(EventPriority::Normal)).unwrap();
        assert!(q.push_back(event(EventPriority::Normal)).is_err());
    }

    #[test]
    fn retry_goes_to_front_of_its_level() {
        let q = PriorityQueue::new(100);
        let first = event(EventPriority::Normal);
        let first_id = first.id;
        q.push_back(first).unwrap();

        let retry = event(EventPriority::Normal);
        let retry_id = retry.id;
        q.push_front(retry);

        let batch = q.drain_batch(2);
        assert_eq!(batch[0].id, retry_id);
        assert_eq!(batch[1].id, first_id);
    }
}
