use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use super::DocumentStore;
use crate::error::StoreError;
use crate::model::{Document, DocumentId, DocumentSummary, DocumentUpdate, Project, ProjectId};

/// In-process store, mainly for tests and embedding hosts.
///
/// Writes to documents marked with [`MemoryStore::fail_updates`] are rejected.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    projects: HashMap<ProjectId, Project>,
    documents: HashMap<DocumentId, Document>,
    order: HashMap<ProjectId, Vec<DocumentId>>,
    failing: HashSet<DocumentId>,
    updates: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_project(&self, project: Project) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.order.entry(project.id.clone()).or_default();
        inner.projects.insert(project.id.clone(), project);
    }

    /// Add a document at the end of its project's listing
    pub fn insert_document(&self, document: Document) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let order = inner.order.entry(document.project_id.clone()).or_default();
        if !order.contains(&document.id) {
            order.push(document.id.clone());
        }
        inner.documents.insert(document.id.clone(), document);
    }

    pub fn fail_updates(&self, id: &DocumentId, failing: bool) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if failing {
            inner.failing.insert(id.clone());
        } else {
            inner.failing.remove(id);
        }
    }

    pub fn document(&self, id: &DocumentId) -> Option<Document> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.documents.get(id).cloned()
    }

    /// Number of successful writes so far
    pub fn update_count(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).updates
    }
}

impl DocumentStore for MemoryStore {
    fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.document(id)
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))
    }

    fn get_project(&self, id: &ProjectId) -> Result<Project, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("project {id}")))
    }

    fn get_project_documents(&self, id: &ProjectId) -> Result<Vec<DocumentSummary>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let order = inner
            .order
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("project {id}")))?;

        Ok(order
            .iter()
            .filter_map(|doc_id| inner.documents.get(doc_id))
            .map(DocumentSummary::from)
            .collect())
    }

    fn update_document(&self, id: &DocumentId, update: &DocumentUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.failing.contains(id) {
            return Err(StoreError::Rejected(format!("document {id} is read-only")));
        }

        let document = inner
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))?;
        document.apply(update);
        inner.updates += 1;
        Ok(())
    }
}
