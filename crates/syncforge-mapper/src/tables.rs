use std::collections::HashMap;

use syncforge_types::{CanonicalStatus, EntityType, System};

/// Which vocabulary a mapping table translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Status,
    EntityType,
    Priority,
}

impl MappingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MappingKind::Status => "status",
            MappingKind::EntityType => "entity_type",
            MappingKind::Priority => "priority",
        }
    }
}

/// A single system's forward table for one [`MappingKind`]: canonical token
/// -> native token. Built once at construction; `reverse()` derives the
/// inverse.
#[derive(Debug, Clone, Default)]
pub struct ForwardTable(pub HashMap<String, String>);

impl ForwardTable {
    pub fn reverse(&self) -> HashMap<String, String> {
        self.0.iter().map(|(k, v)| (v.clone(), k.clone())).collect()
    }
}

/// Compile-time default mapping tables for all four systems, per
/// spec.md §4.1's "Mapping tables" subsection. Real deployments may still
/// layer custom overrides on top via `StatusMapper::add_custom_mapping`.
#[derive(Debug, Clone)]
pub struct DefaultTables {
    pub status: HashMap<System, ForwardTable>,
    pub entity_type: HashMap<System, ForwardTable>,
    pub priority: HashMap<System, ForwardTable>,
}

impl DefaultTables {
    pub fn standard() -> Self {
        Self {
            status: status_tables(),
            entity_type: entity_type_tables(),
            priority: priority_tables(),
        }
    }

    pub fn forward(&self, system: System, kind: MappingKind) -> &ForwardTable {
        let map = match kind {
            MappingKind::Status => &self.status,
            MappingKind::EntityType => &self.entity_type,
            MappingKind::Priority => &self.priority,
        };
        map.get(&system).expect("every system has default tables for every kind")
    }
}

fn status_tables() -> HashMap<System, ForwardTable> {
    use CanonicalStatus::{Cancelled, Completed, Failed, InProgress, Pending};

    let relational = [
        (Pending, "pending"),
        (InProgress, "in_progress"),
        (Completed, "completed"),
        (Failed, "failed"),
        (Cancelled, "cancelled"),
    ];
    let tracker = [
        (Pending, "Open"),
        (InProgress, "In Progress"),
        (Completed, "Done"),
        (Failed, "Won't Fix"),
        (Cancelled, "Cancelled"),
    ];
    let vcs = [
        (Pending, "draft"),
        (InProgress, "open"),
        (Completed, "merged"),
        (Failed, "closed"),
        (Cancelled, "abandoned"),
    ];
    let agent_service = [
        (Pending, "queued"),
        (InProgress, "running"),
        (Completed, "success"),
        (Failed, "failure"),
        (Cancelled, "cancelled"),
    ];

    [
        (System::Relational, build(&relational)),
        (System::Tracker, build(&tracker)),
        (System::Vcs, build(&vcs)),
        (System::AgentService, build(&agent_service)),
    ]
    .into_iter()
    .collect()
}

fn entity_type_tables() -> HashMap<System, ForwardTable> {
    use EntityType::{Deployment, Issue, Pr, Task};

    let relational = [
        (Task, "task"),
        (Issue, "issue"),
        (Pr, "pr"),
        (Deployment, "deployment"),
    ];
    let tracker = [
        (Task, "task"),
        (Issue, "issue"),
        (Pr, "pull_request"),
        (Deployment, "release"),
    ];
    let vcs = [
        (Task, "issue"),
        (Issue, "discussion"),
        (Pr, "pull_request"),
        (Deployment, "deployment"),
    ];
    let agent_service = [
        (Task, "job"),
        (Issue, "ticket_job"),
        (Pr, "review_job"),
        (Deployment, "deploy_job"),
    ];

    [
        (System::Relational, build_entity(&relational)),
        (System::Tracker, build_entity(&tracker)),
        (System::Vcs, build_entity(&vcs)),
        (System::AgentService, build_entity(&agent_service)),
    ]
    .into_iter()
    .collect()
}

fn priority_tables() -> HashMap<System, ForwardTable> {
    let relational = [("critical", "1"), ("high", "2"), ("normal", "3"), ("low", "4")];
    let tracker = [
        ("critical", "P0"),
        ("high", "P1"),
        ("normal", "P2"),
        ("low", "P3"),
    ];
    let vcs = [
        ("critical", "urgent"),
        ("high", "high"),
        ("normal", "normal"),
        ("low", "low"),
    ];
    let agent_service = [
        ("critical", "critical"),
        ("high", "high"),
        ("normal", "normal"),
        ("low", "low"),
    ];

    [
        (System::Relational, build_str(&relational)),
        (System::Tracker, build_str(&tracker)),
        (System::Vcs, build_str(&vcs)),
        (System::AgentService, build_str(&agent_service)),
    ]
    .into_iter()
    .collect()
}

fn build(pairs: &[(CanonicalStatus, &str)]) -> ForwardTable {
    ForwardTable(
        pairs
            .iter()
            .map(|(c, n)| (c.as_str().to_string(), (*n).to_string()))
            .collect(),
    )
}

fn build_entity(pairs: &[(EntityType, &str)]) -> ForwardTable {
    ForwardTable(
        pairs
            .iter()
            .map(|(c, n)| (c.as_str().to_string(), (*n).to_string()))
            .collect(),
    )
}

fn build_str(pairs: &[(&str, &str)]) -> ForwardTable {
    ForwardTable(
        pairs
            .iter()
            .map(|(c, n)| ((*c).to_string(), (*n).to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_system_has_five_status_entries() {
        let tables = DefaultTables::standard();
        for system in System::ALL {
            assert_eq!(tables.forward(system, MappingKind::Status).0.len(), 5);
        }
    }

    #[test]
    fn status_tables_are_injective() {
        let tables = DefaultTables::standard();
        for system in System::ALL {
            let fwd = tables.forward(system, MappingKind::Status);
            let rev = fwd.reverse();
            assert_eq!(rev.len(), fwd.0.len(), "{system} status table must be injective");
        }
    }
}
