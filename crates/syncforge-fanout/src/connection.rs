use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::Envelope;

/// The per-connection state machine from spec.md §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    AwaitingAuth,
    Authenticated,
    Closing,
}

/// Sliding-window rate limiter (spec.md §4.4's "per-connection sliding
/// window"). Exceeding the ceiling drops the message and increments a
/// counter rather than closing the connection.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    state: Mutex<RateLimiterState>,
}

struct RateLimiterState {
    window_start: Instant,
    count: u32,
    dropped: u64,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            state: Mutex::new(RateLimiterState {
                window_start: Instant::now(),
                count: 0,
                dropped: 0,
            }),
        }
    }

    /// Returns `true` if the message is within the window's ceiling.
    pub fn check_and_increment(&self) -> bool {
        let mut state = self.state.lock().expect("rate limiter lock poisoned");
        let now = Instant::now();
        if now.duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.count = 0;
        }
        if state.count >= self.max_requests {
            state.dropped += 1;
            return false;
        }
        state.count += 1;
        true
    }

    pub fn dropped(&self) -> u64 {
        self.state.lock().expect("rate limiter lock poisoned").dropped
    }
}

/// What the hub's registry keeps for each live connection. The per-
/// connection reader/writer tasks own the socket itself; this handle is
/// what `FanoutHub::broadcast`/`send_to_connection` address.
pub struct ConnectionHandle {
    pub id: Uuid,
    sender: mpsc::Sender<Envelope>,
    authenticated: AtomicBool,
    last_activity_ms: AtomicI64,
}

impl ConnectionHandle {
    pub fn new(id: Uuid, sender: mpsc::Sender<Envelope>) -> Self {
        Self {
            id,
            sender,
            authenticated: AtomicBool::new(false),
            last_activity_ms: AtomicI64::new(syncforge_types::now_ms()),
        }
    }

    pub fn mark_authenticated(&self) {
        self.authenticated.store(true, Ordering::SeqCst);
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    pub fn touch(&self) {
        self.last_activity_ms.store(syncforge_types::now_ms(), Ordering::SeqCst);
    }

    pub fn last_activity_ms(&self) -> i64 {
        self.last_activity_ms.load(Ordering::SeqCst)
    }

    /// Enqueues `envelope` on this connection's serializing writer queue
    /// (spec.md §4.4's concurrency note). Drops the message if the
    /// connection's queue is full or closed rather than blocking the
    /// caller — a slow client falls behind, it doesn't stall the hub.
    pub fn try_send(&self, envelope: Envelope) -> bool {
        self.sender.try_send(envelope).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_up_to_ceiling() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        assert!(limiter.check_and_increment());
        assert!(limiter.check_and_increment());
        assert!(limiter.check_and_increment());
        assert!(!limiter.check_and_increment());
        assert_eq!(limiter.dropped(), 1);
    }

    #[test]
    fn connection_handle_tracks_auth_state() {
        let (tx, _rx) = mpsc::channel(8);
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx);
        assert!(!handle.is_authenticated());
        handle.mark_authenticated();
        assert!(handle.is_authenticated());
    }

    #[tokio::test]
    async fn try_send_delivers_to_queue() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx);
        assert!(handle.try_send(crate::protocol::welcome(handle.id)));
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.msg_type, "welcome");
    }
}
