use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::EntityClass;

/// Opaque project identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A labelling project and its ordered class list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    pub entity_classes: Vec<EntityClass>,
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>, entity_classes: Vec<EntityClass>) -> Self {
        Self {
            id,
            name: name.into(),
            entity_classes,
        }
    }
}
