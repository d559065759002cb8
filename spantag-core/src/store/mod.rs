//! Persistence collaborator seam.

mod memory;

use std::thread;

use tracing::warn;

pub use memory::MemoryStore;

use crate::buffer::PendingSave;
use crate::error::StoreError;
use crate::model::{Document, DocumentId, DocumentSummary, DocumentUpdate, Project, ProjectId};

/// Document and project persistence.
///
/// Methods take `&self` so one store can serve concurrent saves.
pub trait DocumentStore {
    fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError>;

    fn get_project(&self, id: &ProjectId) -> Result<Project, StoreError>;

    /// Documents of a project in their display order
    fn get_project_documents(&self, id: &ProjectId) -> Result<Vec<DocumentSummary>, StoreError>;

    fn update_document(&self, id: &DocumentId, update: &DocumentUpdate) -> Result<(), StoreError>;
}

/// Outcome of one write issued by a batched save
#[derive(Debug)]
pub struct SaveResult {
    pub document_id: DocumentId,
    pub revision: u64,
    pub result: Result<(), StoreError>,
}

/// Issue every save concurrently and wait for all of them.
///
/// Results come back in request order; completion order is unspecified.
pub fn persist_all<S>(store: &S, saves: Vec<PendingSave>) -> Vec<SaveResult>
where
    S: DocumentStore + Sync + ?Sized,
{
    thread::scope(|scope| {
        let workers: Vec<_> = saves
            .into_iter()
            .map(|save| {
                let id = save.document_id.clone();
                let revision = save.revision;
                let worker = scope.spawn(move || store.update_document(&save.document_id, &save.update));
                (id, revision, worker)
            })
            .collect();

        workers
            .into_iter()
            .map(|(document_id, revision, worker)| {
                let result = worker.join().unwrap_or_else(|_| {
                    warn!(document = %document_id, "save worker panicked");
                    Err(StoreError::Rejected("save worker panicked".to_string()))
                });
                SaveResult {
                    document_id,
                    revision,
                    result,
                }
            })
            .collect()
    })
}
