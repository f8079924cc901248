use serde::{Deserialize, Serialize};

/// One of the four external systems the core keeps eventually consistent.
///
/// The relational store is the canonical source of truth and, per
/// spec.md's GLOSSARY, the default "sovereign system" under
/// `priority_based` conflict resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum System {
    /// The relational store — canonical source of truth.
    Relational,
    /// The issue tracker.
    Tracker,
    /// The version-control host.
    Vcs,
    /// The agent execution service.
    AgentService,
}

impl System {
    /// All four systems, in a stable order used for iteration during
    /// `mapToAllSystems` and fan-out dispatch.
    pub const ALL: [System; 4] = [
        System::Relational,
        System::Tracker,
        System::Vcs,
        System::AgentService,
    ];

    /// Short machine name, used in metrics labels and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            System::Relational => "relational",
            System::Tracker => "tracker",
            System::Vcs => "vcs",
            System::AgentService => "agent_service",
        }
    }
}

impl std::fmt::Display for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
