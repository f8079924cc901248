use serde::{Deserialize, Serialize};

/// Category of the subject a [`crate::StatusUpdate`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Task,
    Issue,
    Pr,
    Deployment,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Task,
        EntityType::Issue,
        EntityType::Pr,
        EntityType::Deployment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Task => "task",
            EntityType::Issue => "issue",
            EntityType::Pr => "pr",
            EntityType::Deployment => "deployment",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one logical object across all four systems. The mapper is
/// responsible for translating surface encodings of `entity_id`; this type
/// only fixes the invariant that `(entity_type, entity_id)` is the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityKey {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}
