use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::close;
use crate::connection::{ConnectionState, RateLimiter};
use crate::hub::FanoutHub;
use crate::protocol::{self, Envelope, InboundMessage};
use crate::sink::StatusUpdateSink;
use crate::auth::TokenValidator;

/// Shared state handed to every connection's `axum` handler. Cloning is
/// cheap — every field is an `Arc`.
#[derive(Clone)]
pub struct HubState {
    pub hub: Arc<FanoutHub>,
    pub validator: Arc<TokenValidator>,
    pub sink: Arc<dyn StatusUpdateSink>,
}

/// `GET /ws` upgrade entry point.
pub async fn ws_handler(State(state): State<HubState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: HubState) {
    let (id, mut writer_rx) = match state.hub.register() {
        Ok(pair) => pair,
        Err(_) => {
            let (mut sink, _stream) = socket.split();
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: close::OVERLOAD,
                    reason: "connection cap reached".into(),
                })))
                .await;
            return;
        }
    };

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Serializing writer task: every outbound envelope for this connection
    // funnels through `writer_rx` so frames never interleave (spec.md
    // §4.4's concurrency note).
    let writer_task = tokio::spawn(async move {
        while let Some(envelope) = writer_rx.recv().await {
            let text = match serde_json::to_string(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "failed to serialize outbound envelope");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let _ = state.hub.send_to_connection(id, protocol::welcome(id));

    let mut conn_state = if state.hub.config().enable_auth {
        ConnectionState::AwaitingAuth
    } else {
        state.hub.mark_authenticated(id);
        ConnectionState::Authenticated
    };

    let rate_limiter = RateLimiter::new(
        Duration::from_millis(state.hub.config().rate_limit_window_ms),
        state.hub.config().rate_limit_max_requests,
    );

    let auth_deadline = tokio::time::sleep(Duration::from_millis(state.hub.config().auth_timeout_ms));
    tokio::pin!(auth_deadline);
    let mut heartbeat = tokio::time::interval(Duration::from_millis(state.hub.config().heartbeat_interval_ms));

    let close_code = loop {
        tokio::select! {
            frame = ws_stream.next() => {
                let Some(frame) = frame else { break close::HEARTBEAT_OR_SHUTDOWN };
                let Ok(frame) = frame else { break close::INTERNAL_ERROR };

                let text = match frame {
                    Message::Text(text) => text,
                    Message::Close(_) => break close::HEARTBEAT_OR_SHUTDOWN,
                    _ => continue,
                };

                state.hub.touch(id);

                if !rate_limiter.check_and_increment() {
                    continue;
                }

                let Ok(envelope) = serde_json::from_str::<Envelope>(&text) else {
                    let _ = state.hub.send_to_connection(id, protocol::error("malformed envelope"));
                    continue;
                };

                let Ok(message) = InboundMessage::parse(&envelope) else {
                    let _ = state.hub.send_to_connection(id, protocol::error(format!(
                        "unknown or malformed message type {:?}", envelope.msg_type
                    )));
                    continue;
                };

                if conn_state == ConnectionState::AwaitingAuth {
                    match message {
                        InboundMessage::Auth { token } => {
                            match state.validator.validate(&token) {
                                Ok(_claims) => {
                                    state.hub.mark_authenticated(id);
                                    conn_state = ConnectionState::Authenticated;
                                    let _ = state.hub.send_to_connection(id, protocol::auth_success(id));
                                }
                                Err(_) => break close::AUTH_FAILURE_OR_TIMEOUT,
                            }
                        }
                        _ => {
                            let _ = state.hub.send_to_connection(id, protocol::error(
                                "connection is not authenticated",
                            ));
                        }
                    }
                    continue;
                }

                match message {
                    InboundMessage::Auth { token } => {
                        if state.validator.validate(&token).is_ok() {
                            let _ = state.hub.send_to_connection(id, protocol::auth_success(id));
                        }
                    }
                    InboundMessage::Subscribe { room } => {
                        state.hub.join_room(id, &room);
                        let _ = state.hub.send_to_connection(id, protocol::subscribed(&room));
                    }
                    InboundMessage::Unsubscribe { room } => {
                        state.hub.leave_room(id, &room);
                        let _ = state.hub.send_to_connection(id, protocol::unsubscribed(&room));
                    }
                    InboundMessage::JoinRoom { room } => {
                        state.hub.join_room(id, &room);
                        let _ = state.hub.send_to_connection(id, protocol::subscribed(&room));
                    }
                    InboundMessage::LeaveRoom { room } => {
                        state.hub.leave_room(id, &room);
                        let _ = state.hub.send_to_connection(id, protocol::unsubscribed(&room));
                    }
                    InboundMessage::StatusUpdate(update) => {
                        state.sink.accept(update).await;
                    }
                    InboundMessage::Ping => {
                        let _ = state.hub.send_to_connection(id, protocol::pong());
                    }
                }
            }
            () = &mut auth_deadline, if conn_state == ConnectionState::AwaitingAuth => {
                break close::AUTH_FAILURE_OR_TIMEOUT;
            }
            _ = heartbeat.tick() => {
                let cutoff = syncforge_types::now_ms() - state.hub.config().heartbeat_timeout_ms as i64;
                if state.hub.stale_connections(cutoff).contains(&id) {
                    break close::HEARTBEAT_OR_SHUTDOWN;
                }
            }
        }
    };

    info!(connection_id = %id, close_code, "connection:closed");
    state.hub.remove(id);
    writer_task.abort();
}
