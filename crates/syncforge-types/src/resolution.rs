use serde::{Deserialize, Serialize};

use crate::{system::System, update::StatusUpdate, TimestampMs};

/// Which built-in (or user-registered) strategy produced a [`Resolution`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionStrategyKind {
    PriorityBased,
    TimestampBased,
    Manual,
    Merge,
    /// A user-registered strategy, identified by the name it was registered
    /// under.
    Custom { name: String },
}

impl std::fmt::Display for ResolutionStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionStrategyKind::PriorityBased => f.write_str("priority_based"),
            ResolutionStrategyKind::TimestampBased => f.write_str("timestamp_based"),
            ResolutionStrategyKind::Manual => f.write_str("manual"),
            ResolutionStrategyKind::Merge => f.write_str("merge"),
            ResolutionStrategyKind::Custom { name } => write!(f, "custom:{name}"),
        }
    }
}

/// The outcome of resolving a batch of conflicts for one update (spec.md
/// §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_update: StatusUpdate,
    pub winning_system: System,
    pub reason: String,
    pub conflicts_resolved: usize,
    pub strategy: ResolutionStrategyKind,
    pub automatic: bool,
    pub timestamp: TimestampMs,
}

impl Resolution {
    /// The validation spec.md §4.3 requires of every resolver before it is
    /// accepted: `resolved_update` and `reason` must be present (the type
    /// system already guarantees `resolved_update` exists, so this checks
    /// `reason`), and in strict mode `conflicts_resolved` must account for
    /// every conflict handed in.
    pub fn validate(&self, conflicts_len: usize, strict: bool) -> Result<(), &'static str> {
        if self.reason.trim().is_empty() {
            return Err("resolution reason must not be empty");
        }
        if strict && self.conflicts_resolved != conflicts_len {
            return Err("strict mode requires conflicts_resolved == conflicts.len()");
        }
        Ok(())
    }
}
