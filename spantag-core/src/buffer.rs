//! Session-scoped store of unsaved per-document edits.
//!
//! The buffer state sits behind an `Arc` and is copied on write, so a view
//! taken with [`ChangeBuffer::view`] never observes a half-applied edit.
//!
//! # Invariants
//! - Every recorded edit gets a fresh revision; a save only clears the entry
//!   it captured, never a newer edit made while the write was in flight.
//! - A document leaves the dirty set only when a save of its current revision
//!   succeeds, or when the buffer is discarded.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::entities::EntitySet;
use crate::error::{SaveAllError, SaveError};
use crate::model::annotation::{to_annotations, to_records};
use crate::model::{Annotation, DocumentId, DocumentUpdate, Entity, EntityRecord};
use crate::store::{persist_all, DocumentStore, SaveResult};

/// Immutable capture of one document's entities.
///
/// Both persisted shapes are derived from the same entities on demand, so
/// they cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSnapshot {
    entities: Arc<[Entity]>,
}

impl ChangeSnapshot {
    pub fn new(entities: Arc<[Entity]>) -> Self {
        Self { entities }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn records(&self) -> Vec<EntityRecord> {
        to_records(&self.entities)
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        to_annotations(&self.entities)
    }

    pub fn to_update(&self) -> DocumentUpdate {
        DocumentUpdate::annotations(&self.entities)
    }

    pub fn to_set(&self) -> EntitySet {
        EntitySet::new(self.entities.to_vec())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    snapshot: ChangeSnapshot,
    revision: u64,
}

/// Read-only view of the buffer at one point in time
#[derive(Debug, Clone, Default)]
pub struct BufferState {
    entries: HashMap<DocumentId, Entry>,
    dirty: BTreeSet<DocumentId>,
    next_revision: u64,
}

impl BufferState {
    pub fn is_dirty(&self, id: &DocumentId) -> bool {
        self.dirty.contains(id)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    pub fn dirty_ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.dirty.iter()
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn snapshot(&self, id: &DocumentId) -> Option<&ChangeSnapshot> {
        self.entries.get(id).map(|entry| &entry.snapshot)
    }

    pub fn revision(&self, id: &DocumentId) -> Option<u64> {
        self.entries.get(id).map(|entry| entry.revision)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.dirty.is_empty()
    }

    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    fn clear_if_current(&mut self, id: &DocumentId, revision: u64) -> bool {
        match self.entries.get(id) {
            Some(entry) if entry.revision != revision => {
                debug!(
                    document = %id,
                    saved = revision,
                    current = entry.revision,
                    "document edited while saving, keeping newer edits"
                );
                false
            }
            _ => {
                self.entries.remove(id);
                self.dirty.remove(id);
                true
            }
        }
    }
}

/// A write captured from the buffer, ready to hand to a store
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub document_id: DocumentId,
    pub revision: u64,
    pub update: DocumentUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Nothing to write; the document had no pending edits
    Clean,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeBuffer {
    state: Arc<BufferState>,
}

impl ChangeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Arc<BufferState> {
        Arc::clone(&self.state)
    }

    pub fn is_dirty(&self, id: &DocumentId) -> bool {
        self.state.is_dirty(id)
    }

    pub fn dirty_count(&self) -> usize {
        self.state.dirty_count()
    }

    pub fn snapshot(&self, id: &DocumentId) -> Option<ChangeSnapshot> {
        self.state.snapshot(id).cloned()
    }

    /// Store the persisted entities of a freshly loaded document.
    ///
    /// Does nothing if the document is already buffered; returns whether it
    /// was inserted.
    pub fn seed(&mut self, id: &DocumentId, entities: &EntitySet) -> bool {
        if self.state.contains(id) {
            return false;
        }
        let state = Arc::make_mut(&mut self.state);
        let revision = state.bump();
        state.entries.insert(
            id.clone(),
            Entry {
                snapshot: entities.snapshot(),
                revision,
            },
        );
        true
    }

    /// Replace the document's snapshot and mark it dirty
    pub fn record_edit(&mut self, id: &DocumentId, entities: &EntitySet) -> u64 {
        let state = Arc::make_mut(&mut self.state);
        let revision = state.bump();
        state.entries.insert(
            id.clone(),
            Entry {
                snapshot: entities.snapshot(),
                revision,
            },
        );
        state.dirty.insert(id.clone());
        debug!(document = %id, revision, entities = entities.len(), "recorded edit");
        revision
    }

    /// Capture the write for a dirty document; `None` if it is clean.
    pub fn begin_save(&self, id: &DocumentId) -> Option<PendingSave> {
        if !self.state.is_dirty(id) {
            return None;
        }
        let entry = self.state.entries.get(id)?;
        Some(PendingSave {
            document_id: id.clone(),
            revision: entry.revision,
            update: entry.snapshot.to_update(),
        })
    }

    /// Capture writes for every document dirty right now.
    ///
    /// Dirty documents without a stored snapshot are skipped.
    pub fn begin_save_all(&self) -> Vec<PendingSave> {
        self.state
            .dirty_ids()
            .filter_map(|id| self.begin_save(id))
            .collect()
    }

    /// Record a successful write; returns whether the entry was cleared.
    pub fn complete_save(&mut self, id: &DocumentId, revision: u64) -> bool {
        let cleared = Arc::make_mut(&mut self.state).clear_if_current(id, revision);
        if cleared {
            info!(document = %id, revision, "saved document");
        }
        cleared
    }

    /// Apply the results of a batched save.
    ///
    /// Successful documents are cleared even if others failed. Only when every
    /// write succeeded are clean entries and snapshot-less dirty marks dropped.
    pub fn finish_save_all(&mut self, results: Vec<SaveResult>) -> Result<usize, SaveAllError> {
        let state = Arc::make_mut(&mut self.state);
        let mut saved = 0;
        let mut failed = Vec::new();

        for SaveResult {
            document_id,
            revision,
            result,
        } in results
        {
            match result {
                Ok(()) => {
                    state.clear_if_current(&document_id, revision);
                    saved += 1;
                }
                Err(err) => {
                    warn!(document = %document_id, error = %err, "batched save failed");
                    failed.push((document_id, err));
                }
            }
        }

        if !failed.is_empty() {
            return Err(SaveAllError { saved, failed });
        }

        let BufferState { entries, dirty, .. } = state;
        dirty.retain(|id| entries.contains_key(id));
        entries.retain(|id, _| dirty.contains(id));
        info!(saved, "saved all documents");
        Ok(saved)
    }

    pub fn save<S>(&mut self, store: &S, id: &DocumentId) -> Result<SaveOutcome, SaveError>
    where
        S: DocumentStore + ?Sized,
    {
        let Some(pending) = self.begin_save(id) else {
            return Ok(SaveOutcome::Clean);
        };

        match store.update_document(&pending.document_id, &pending.update) {
            Ok(()) => {
                self.complete_save(&pending.document_id, pending.revision);
                Ok(SaveOutcome::Saved)
            }
            Err(source) => {
                warn!(document = %id, error = %source, "save failed");
                Err(SaveError {
                    document_id: pending.document_id,
                    source,
                })
            }
        }
    }

    /// Save every dirty document concurrently; returns how many were written.
    pub fn save_all<S>(&mut self, store: &S) -> Result<usize, SaveAllError>
    where
        S: DocumentStore + Sync + ?Sized,
    {
        let results = persist_all(store, self.begin_save_all());
        self.finish_save_all(results)
    }

    /// Drop every buffered edit
    pub fn discard(&mut self) -> usize {
        let dropped = self.state.dirty_count();
        if dropped > 0 {
            warn!(dropped, "discarding unsaved documents");
        }
        self.state = Arc::new(BufferState::default());
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::{Document, EntityClass, Project, TextRange};
    use crate::store::MemoryStore;

    const TEXT: &str = "Barack Obama was president.";

    fn person() -> EntityClass {
        EntityClass::new("PERSON", "#ff0000")
    }

    fn edited() -> EntitySet {
        EntitySet::default().add(Entity::from_range(TEXT, TextRange::new(0, 12), &person()).unwrap())
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_project(Project::new("p".into(), "News", vec![person()]));
        for id in ["a", "b", "c"] {
            store.insert_document(Document::new(id.into(), "p".into(), TEXT));
        }
        store
    }

    #[test]
    fn test_seed_is_clean_and_lazy() {
        let mut buffer = ChangeBuffer::new();
        let id = DocumentId::from("a");

        assert!(buffer.seed(&id, &edited()));
        assert!(!buffer.seed(&id, &EntitySet::default()));
        assert!(!buffer.is_dirty(&id));
        assert_eq!(buffer.snapshot(&id).unwrap().entities().len(), 1);
    }

    #[test]
    fn test_record_edit_marks_dirty_with_both_shapes() {
        let mut buffer = ChangeBuffer::new();
        let id = DocumentId::from("a");
        buffer.record_edit(&id, &edited());

        assert!(buffer.is_dirty(&id));
        let snapshot = buffer.snapshot(&id).unwrap();
        assert_eq!(snapshot.annotations()[0].start_index, 0);
        assert_eq!(snapshot.records()[0].label, "PERSON");
    }

    #[test]
    fn test_view_is_not_affected_by_later_edits() {
        let mut buffer = ChangeBuffer::new();
        let view = buffer.view();
        buffer.record_edit(&"a".into(), &edited());

        assert_eq!(view.dirty_count(), 0);
        assert_eq!(buffer.dirty_count(), 1);
    }

    #[test]
    fn test_save_clears_entry_and_is_idempotent() {
        let store = store();
        let mut buffer = ChangeBuffer::new();
        let id = DocumentId::from("a");
        buffer.record_edit(&id, &edited());

        assert_eq!(buffer.save(&store, &id).unwrap(), SaveOutcome::Saved);
        assert!(!buffer.is_dirty(&id));
        assert!(buffer.snapshot(&id).is_none());
        assert_eq!(store.document(&id).unwrap().annotations.len(), 1);

        assert_eq!(buffer.save(&store, &id).unwrap(), SaveOutcome::Clean);
        assert_eq!(store.update_count(), 1);
    }

    #[test]
    fn test_failed_save_keeps_edits() {
        let store = store();
        let mut buffer = ChangeBuffer::new();
        let id = DocumentId::from("a");
        store.fail_updates(&id, true);
        buffer.record_edit(&id, &edited());

        let err = buffer.save(&store, &id).unwrap_err();

        assert_eq!(err.document_id, id);
        assert!(matches!(err.source, StoreError::Rejected(_)));
        assert!(buffer.is_dirty(&id));
        assert!(buffer.snapshot(&id).is_some());
    }

    #[test]
    fn test_stale_completion_keeps_newer_edit() {
        let mut buffer = ChangeBuffer::new();
        let id = DocumentId::from("a");
        buffer.record_edit(&id, &edited());
        let pending = buffer.begin_save(&id).unwrap();

        buffer.record_edit(&id, &EntitySet::default());

        assert!(!buffer.complete_save(&id, pending.revision));
        assert!(buffer.is_dirty(&id));
        assert!(buffer.snapshot(&id).unwrap().entities().is_empty());
    }

    #[test]
    fn test_save_all_clears_everything() {
        let store = store();
        let mut buffer = ChangeBuffer::new();
        buffer.seed(&"c".into(), &EntitySet::default());
        buffer.record_edit(&"a".into(), &edited());
        buffer.record_edit(&"b".into(), &edited());

        assert_eq!(buffer.save_all(&store).unwrap(), 2);
        assert!(buffer.view().is_empty());
        assert_eq!(store.document(&"b".into()).unwrap().annotations.len(), 1);
    }

    #[test]
    fn test_save_all_partial_failure_keeps_only_failed() {
        let store = store();
        let mut buffer = ChangeBuffer::new();
        store.fail_updates(&"b".into(), true);
        buffer.record_edit(&"a".into(), &edited());
        buffer.record_edit(&"b".into(), &edited());

        let err = buffer.save_all(&store).unwrap_err();

        assert_eq!(err.saved, 1);
        assert_eq!(err.failed_ids(), vec![DocumentId::from("b")]);
        assert!(!buffer.is_dirty(&"a".into()));
        assert!(buffer.is_dirty(&"b".into()));

        store.fail_updates(&"b".into(), false);
        assert_eq!(buffer.save_all(&store).unwrap(), 1);
        assert_eq!(buffer.dirty_count(), 0);
    }

    #[test]
    fn test_discard() {
        let mut buffer = ChangeBuffer::new();
        buffer.record_edit(&"a".into(), &edited());

        assert_eq!(buffer.discard(), 1);
        assert!(buffer.view().is_empty());
    }
}
