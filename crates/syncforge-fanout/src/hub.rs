use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::connection::ConnectionHandle;
use crate::error::{FanoutError, Result};
use crate::protocol::Envelope;

/// Tunables for [`FanoutHub`] (spec.md §6's "Fan-out" configuration
/// group).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    pub max_connections: usize,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
    pub auth_timeout_ms: u64,
    pub enable_auth: bool,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max_requests: u32,
    pub writer_queue_capacity: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 10_000,
            auth_timeout_ms: 10_000,
            enable_auth: true,
            rate_limit_window_ms: 1_000,
            rate_limit_max_requests: 20,
            writer_queue_capacity: 256,
        }
    }
}

/// The real-time fan-out hub (C4): tracks live connections and room
/// membership, and dispatches broadcast/direct sends onto each
/// connection's serializing writer queue.
///
/// Connection and room maps are each guarded by their own `RwLock`, per
/// spec.md §5's "reader-writer lock, writers only on join/leave/accept/
/// close" policy.
pub struct FanoutHub {
    config: FanoutConfig,
    connections: RwLock<HashMap<Uuid, ConnectionHandle>>,
    rooms: RwLock<HashMap<String, HashSet<Uuid>>>,
}

impl FanoutHub {
    pub fn new(config: FanoutConfig) -> Self {
        Self {
            config,
            connections: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }

    /// Registers a new connection, enforcing the total-connection cap
    /// (spec.md §4.4 state 1, transport code 1013 on rejection).
    pub fn register(&self) -> Result<(Uuid, mpsc::Receiver<Envelope>)> {
        let mut connections = self.connections.write().expect("connections lock poisoned");
        if connections.len() >= self.config.max_connections {
            return Err(FanoutError::Overloaded);
        }

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.config.writer_queue_capacity);
        connections.insert(id, ConnectionHandle::new(id, tx));
        debug!(connection_id = %id, "connection:new");
        Ok((id, rx))
    }

    pub fn mark_authenticated(&self, id: Uuid) {
        if let Some(handle) = self.connections.read().expect("connections lock poisoned").get(&id) {
            handle.mark_authenticated();
            debug!(connection_id = %id, "connection:authenticated");
        }
    }

    pub fn touch(&self, id: Uuid) {
        if let Some(handle) = self.connections.read().expect("connections lock poisoned").get(&id) {
            handle.touch();
        }
    }

    /// Removes a connection and leaves it from every room it joined,
    /// destroying any room left empty (spec.md §4.4 state 4).
    pub fn remove(&self, id: Uuid) {
        self.connections.write().expect("connections lock poisoned").remove(&id);
        let mut rooms = self.rooms.write().expect("rooms lock poisoned");
        rooms.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
        debug!(connection_id = %id, "connection:closed");
    }

    pub fn join_room(&self, id: Uuid, room: &str) {
        self.rooms
            .write()
            .expect("rooms lock poisoned")
            .entry(room.to_string())
            .or_default()
            .insert(id);
        debug!(connection_id = %id, room, "room:joined");
    }

    /// Leaves `room`; the room is destroyed on last leave (spec.md
    /// §4.4's `leaveRoom` contract).
    pub fn leave_room(&self, id: Uuid, room: &str) {
        let mut rooms = self.rooms.write().expect("rooms lock poisoned");
        if let Some(members) = rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
        debug!(connection_id = %id, room, "room:left");
    }

    pub fn send_to_connection(&self, id: Uuid, envelope: Envelope) -> Result<()> {
        let connections = self.connections.read().expect("connections lock poisoned");
        let handle = connections.get(&id).ok_or(FanoutError::ConnectionNotFound(id))?;
        if !handle.try_send(envelope) {
            warn!(connection_id = %id, "writer queue full or closed, dropping message");
        }
        Ok(())
    }

    /// Fans `envelope` out to every authenticated connection, or to the
    /// members of `room` if given (spec.md §4.4's `broadcast` contract).
    /// Returns the number of connections the message was enqueued to.
    pub fn broadcast(&self, envelope: &Envelope, room: Option<&str>) -> usize {
        let connections = self.connections.read().expect("connections lock poisoned");

        let targets: Vec<Uuid> = match room {
            Some(room) => {
                let rooms = self.rooms.read().expect("rooms lock poisoned");
                rooms.get(room).map(|members| members.iter().copied().collect()).unwrap_or_default()
            }
            None => connections.keys().copied().collect(),
        };

        let mut delivered = 0;
        for id in targets {
            if let Some(handle) = connections.get(&id) {
                if !handle.is_authenticated() {
                    continue;
                }
                if handle.try_send(envelope.clone()) {
                    delivered += 1;
                } else {
                    warn!(connection_id = %id, "writer queue full or closed, dropping broadcast");
                }
            }
        }
        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().expect("connections lock poisoned").len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().expect("rooms lock poisoned").len()
    }

    /// Connections whose last activity predates `cutoff_ms` (absolute
    /// timestamp), used by the heartbeat sweep to find dead peers.
    pub fn stale_connections(&self, cutoff_ms: i64) -> Vec<Uuid> {
        self.connections
            .read()
            .expect("connections lock poisoned")
            .values()
            .filter(|handle| handle.last_activity_ms() < cutoff_ms)
            .map(|handle| handle.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol;

    #[test]
    fn register_enforces_connection_cap() {
        let hub = FanoutHub::new(FanoutConfig { max_connections: 1, ..FanoutConfig::default() });
        assert!(hub.register().is_ok());
        assert!(matches!(hub.register(), Err(FanoutError::Overloaded)));
    }

    #[test]
    fn room_is_destroyed_on_last_leave() {
        let hub = FanoutHub::new(FanoutConfig::default());
        let (id, _rx) = hub.register().unwrap();
        hub.join_room(id, "task:T1");
        assert_eq!(hub.room_count(), 1);
        hub.leave_room(id, "task:T1");
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn remove_leaves_all_rooms() {
        let hub = FanoutHub::new(FanoutConfig::default());
        let (id, _rx) = hub.register().unwrap();
        hub.join_room(id, "task:T1");
        hub.join_room(id, "task");
        hub.remove(id);
        assert_eq!(hub.room_count(), 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn broadcast_only_reaches_authenticated_connections() {
        let hub = FanoutHub::new(FanoutConfig::default());
        let (id, _rx) = hub.register().unwrap();
        let delivered = hub.broadcast(&protocol::broadcast(serde_json::json!({})), None);
        assert_eq!(delivered, 0);

        hub.mark_authenticated(id);
        let delivered = hub.broadcast(&protocol::broadcast(serde_json::json!({})), None);
        assert_eq!(delivered, 1);
    }

    #[test]
    fn broadcast_to_room_only_reaches_members() {
        let hub = FanoutHub::new(FanoutConfig::default());
        let (a, _rx_a) = hub.register().unwrap();
        let (b, _rx_b) = hub.register().unwrap();
        hub.mark_authenticated(a);
        hub.mark_authenticated(b);
        hub.join_room(a, "task:T1");

        let delivered = hub.broadcast(&protocol::broadcast(serde_json::json!({})), Some("task:T1"));
        assert_eq!(delivered, 1);
    }

    #[test]
    fn send_to_connection_reports_missing_connection() {
        let hub = FanoutHub::new(FanoutConfig::default());
        let result = hub.send_to_connection(Uuid::new_v4(), protocol::pong());
        assert!(matches!(result, Err(FanoutError::ConnectionNotFound(_))));
    }
}
