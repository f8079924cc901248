use syncforge_types::Conflict;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConflictError>;

/// Errors from the conflict detector/resolver (spec.md §4.3, §7's
/// "Conflict" error kind).
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The `manual` strategy (or a strategy that defers to it) refuses to
    /// auto-resolve.
    #[error("manual resolution required for {0} conflict(s)")]
    ManualResolutionRequired(usize),

    /// `conflicts.len() >= escalation_threshold` and the chosen strategy
    /// failed; the orchestrator is free to dead-letter the update.
    #[error("escalated: {} unresolved conflict(s)", .conflicts.len())]
    Escalated { conflicts: Vec<Conflict> },

    /// The resolver produced a [`syncforge_types::Resolution`] that failed
    /// its own validation (missing reason, or `conflicts_resolved`
    /// mismatch under strict mode).
    #[error("invalid resolution: {0}")]
    InvalidResolution(String),

    /// No strategy is registered under the requested name.
    #[error("no resolution strategy registered as {0:?}")]
    UnknownStrategy(String),
}
