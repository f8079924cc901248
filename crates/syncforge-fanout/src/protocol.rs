use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FanoutError, Result};

/// The wire envelope every frame uses (spec.md §6): `{ type, timestamp,
/// data }`, serialized as one newline-delimited JSON text frame per
/// message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(msg_type: impl Into<String>, data: Value) -> Self {
        Self {
            msg_type: msg_type.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Inbound message types the hub accepts from a client (spec.md §4.4).
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Auth { token: String },
    Subscribe { room: String },
    Unsubscribe { room: String },
    JoinRoom { room: String },
    LeaveRoom { room: String },
    StatusUpdate(syncforge_types::StatusUpdate),
    Ping,
}

impl InboundMessage {
    pub fn parse(envelope: &Envelope) -> Result<Self> {
        match envelope.msg_type.as_str() {
            "auth" => {
                let token = envelope
                    .data
                    .get("token")
                    .and_then(Value::as_str)
                    .ok_or_else(|| FanoutError::MalformedMessage("auth requires data.token".into()))?;
                Ok(InboundMessage::Auth { token: token.to_string() })
            }
            "subscribe" => Ok(InboundMessage::Subscribe { room: room_field(envelope)? }),
            "unsubscribe" => Ok(InboundMessage::Unsubscribe { room: room_field(envelope)? }),
            "join_room" => Ok(InboundMessage::JoinRoom { room: room_field(envelope)? }),
            "leave_room" => Ok(InboundMessage::LeaveRoom { room: room_field(envelope)? }),
            "status_update" => {
                let update = serde_json::from_value(envelope.data.clone())
                    .map_err(|e| FanoutError::MalformedMessage(e.to_string()))?;
                Ok(InboundMessage::StatusUpdate(update))
            }
            "ping" => Ok(InboundMessage::Ping),
            other => Err(FanoutError::UnknownMessageType(other.to_string())),
        }
    }
}

fn room_field(envelope: &Envelope) -> Result<String> {
    envelope
        .data
        .get("room")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| FanoutError::MalformedMessage("expected data.room".into()))
}

/// Outbound envelope constructors (spec.md §6's "Outbound types").
pub fn welcome(connection_id: Uuid) -> Envelope {
    Envelope::new("welcome", serde_json::json!({ "connectionId": connection_id }))
}

pub fn auth_success(connection_id: Uuid) -> Envelope {
    Envelope::new("auth_success", serde_json::json!({ "connectionId": connection_id }))
}

pub fn subscribed(room: &str) -> Envelope {
    Envelope::new("subscribed", serde_json::json!({ "room": room }))
}

pub fn unsubscribed(room: &str) -> Envelope {
    Envelope::new("unsubscribed", serde_json::json!({ "room": room }))
}

pub fn pong() -> Envelope {
    Envelope::new("pong", serde_json::json!({ "timestamp": Utc::now() }))
}

pub fn error(message: impl Into<String>) -> Envelope {
    Envelope::new("error", serde_json::json!({ "message": message.into() }))
}

pub fn broadcast(payload: Value) -> Envelope {
    Envelope::new("broadcast", payload)
}

pub fn direct(payload: Value) -> Envelope {
    Envelope::new("direct", payload)
}
