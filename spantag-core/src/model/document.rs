use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::annotation::{to_annotations, to_records, Annotation, EntityRecord};
use super::entity::Entity;
use super::project::ProjectId;

/// Opaque document identifier assigned by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
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

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Completion status of a document
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    InProgress,
    Completed,
}

impl DocumentStatus {
    pub fn toggled(self) -> Self {
        match self {
            DocumentStatus::InProgress => DocumentStatus::Completed,
            DocumentStatus::Completed => DocumentStatus::InProgress,
        }
    }

    pub fn is_completed(self) -> bool {
        self == DocumentStatus::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::InProgress => "in progress",
            DocumentStatus::Completed => "completed",
        }
    }
}

/// A stored document with its persisted annotations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub text: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(id: DocumentId, project_id: ProjectId, text: impl Into<String>) -> Self {
        Self {
            id,
            project_id,
            name: None,
            text: text.into(),
            status: DocumentStatus::default(),
            annotations: Vec::new(),
            entities: Vec::new(),
            updated_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Apply a partial update; absent fields keep their stored value.
    pub fn apply(&mut self, update: &DocumentUpdate) {
        if let Some(entities) = &update.entities {
            self.entities = entities.clone();
        }
        if let Some(annotations) = &update.annotations {
            self.annotations = annotations.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Entry of a project's ordered document listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
        }
    }
}

/// Partial document write sent to the store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<EntityRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<Annotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DocumentStatus>,
}

impl DocumentUpdate {
    /// Annotation write carrying both persisted shapes of `entities`
    pub fn annotations(entities: &[Entity]) -> Self {
        Self {
            entities: Some(to_records(entities)),
            annotations: Some(to_annotations(entities)),
            status: None,
        }
    }

    pub fn status(status: DocumentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}
