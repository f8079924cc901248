use thiserror::Error;

pub type Result<T> = std::result::Result<T, FanoutError>;

/// Errors the fan-out hub surfaces (spec.md §7's "Fanout" error kind).
#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("connection {0} not found")]
    ConnectionNotFound(uuid::Uuid),

    #[error("total connection cap reached")]
    Overloaded,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("authentication timed out")]
    AuthTimeout,

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unknown message type {0:?}")]
    UnknownMessageType(String),
}
