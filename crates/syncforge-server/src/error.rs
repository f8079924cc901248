use thiserror::Error;

/// Boot-time failures. Everything past startup is handled per-request by
/// the component crates' own error types; `anyhow` carries these upward to
/// `main` the way `kimberlite-config::loader` hands `anyhow::Result` back
/// to its caller.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: std::net::SocketAddr, #[source] source: std::io::Error },

    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),
}
