use thiserror::Error;

/// Dispatch error taxonomy (spec.md §7): transient errors are retried by
/// C2 with backoff, permanent errors are dead-lettered after one attempt.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("timed out calling {system}")]
    Timeout { system: &'static str },

    #[error("{system} is unreachable: {detail}")]
    Unavailable { system: &'static str, detail: String },

    #[error("{system} reported {entity_id} not found")]
    NotFound { system: &'static str, entity_id: String },

    #[error("{system} rejected the request: {detail}")]
    Forbidden { system: &'static str, detail: String },

    #[error("{system} cancelled the in-flight call")]
    Cancelled { system: &'static str },
}

impl AdapterError {
    /// Whether spec.md §7 classifies this as transient (retryable) or
    /// permanent (dead-letter after one attempt).
    pub fn is_transient(&self) -> bool {
        matches!(self, AdapterError::Timeout { .. } | AdapterError::Unavailable { .. })
    }
}
