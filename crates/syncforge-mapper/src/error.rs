use syncforge_types::System;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MapperError>;

/// Errors raised while translating a [`syncforge_types::StatusUpdate`]
/// between systems (spec.md §4.1, §7's "Mapping" error kind).
#[derive(Debug, Error)]
pub enum MapperError {
    /// Strict mode could not find an image for `value` under `kind` when
    /// mapping from `src` to `dst`.
    #[error("no mapping for {kind} value {value:?} from {src} to {dst}")]
    Unmapped {
        kind: &'static str,
        value: String,
        src: System,
        dst: System,
    },

    /// The target system's allow-list rejected the mapped value.
    #[error("{dst} rejects mapped status {value:?}: not in its allow-list")]
    ValidationRejected { dst: System, value: String },
}
