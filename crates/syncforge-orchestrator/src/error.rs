use syncforge_types::Conflict;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// The error taxonomy from spec.md §7, narrowed to the outcomes
/// `synchronize` itself can surface (per-target dispatch failures are
/// captured in [`crate::SyncOutcome::results`] instead, never here).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{} unresolved conflict(s) require manual review", .0.len())]
    Conflict(Vec<Conflict>),

    #[error("no adapter registered for system {0:?}")]
    NoAdapter(syncforge_types::System),

    #[error("shutdown in progress")]
    Shutdown,

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Whether this error kind should be retried by C2 (spec.md §7's
    /// propagation policy). Only a transient dispatch failure qualifies;
    /// every kind `synchronize` can return here is either a caller-repair
    /// case (`Validation`, `Conflict`) or terminal (`Shutdown`,
    /// `Internal`, `NoAdapter`), so none are retried automatically.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
