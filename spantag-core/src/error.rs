use crate::model::DocumentId;

/// Failure reported by a document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed stored data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// A single-document save failed; its buffered edits are kept
#[derive(Debug, thiserror::Error)]
#[error("failed to save document {document_id}")]
pub struct SaveError {
    pub document_id: DocumentId,
    #[source]
    pub source: StoreError,
}

/// At least one document of a batched save failed.
///
/// Documents that did save are already cleared from the buffer; only the
/// listed ones remain dirty.
#[derive(Debug, thiserror::Error)]
#[error("{} document(s) failed to save, {saved} saved", .failed.len())]
pub struct SaveAllError {
    pub saved: usize,
    pub failed: Vec<(DocumentId, StoreError)>,
}

impl SaveAllError {
    pub fn failed_ids(&self) -> Vec<DocumentId> {
        self.failed.iter().map(|(id, _)| id.clone()).collect()
    }
}
