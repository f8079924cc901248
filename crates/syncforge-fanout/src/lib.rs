//! # syncforge-fanout
//!
//! The real-time fan-out hub (C4): a websocket surface that authenticates
//! connections, tracks room membership, and relays mapped updates back out
//! to subscribers. See spec.md §4.4 and §6.

mod auth;
mod close;
mod connection;
mod error;
mod handler;
mod hub;
mod protocol;
mod sink;

pub use auth::{Claims, TokenValidator};
pub use close::{AUTH_FAILURE_OR_TIMEOUT, HEARTBEAT_OR_SHUTDOWN, INTERNAL_ERROR, OVERLOAD};
pub use connection::{ConnectionHandle, ConnectionState, RateLimiter};
pub use error::{FanoutError, Result};
pub use handler::{ws_handler, HubState};
pub use hub::{FanoutConfig, FanoutHub};
pub use protocol::{broadcast, Envelope, InboundMessage};
pub use sink::StatusUpdateSink;
