use std::collections::VecDeque;

use tracing::debug;

use super::{Effect, Event, LoadedDocument, Session};
use crate::error::StoreError;
use crate::model::{DocumentId, DocumentUpdate};
use crate::store::{persist_all, DocumentStore};

/// Runs session effects against a store, synchronously.
///
/// Store effects are executed and their results fed back into the session
/// until only host-facing effects remain (navigation, prompts, notices,
/// selection clearing); those are returned in the order they were produced.
#[derive(Debug)]
pub struct Driver<S> {
    store: S,
}

impl<S> Driver<S>
where
    S: DocumentStore + Sync,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn dispatch(&self, session: &mut Session, event: Event) -> Vec<Effect> {
        let mut queue: VecDeque<Effect> = session.handle(event).into();
        let mut host = Vec::new();

        while let Some(effect) = queue.pop_front() {
            match self.execute(effect) {
                Ok(event) => queue.extend(session.handle(event)),
                Err(effect) => host.push(effect),
            }
        }
        host
    }

    /// Fetch a document with its project and the project's listing
    pub fn load(&self, id: &DocumentId) -> Result<LoadedDocument, StoreError> {
        let document = self.store.get_document(id)?;
        let project = self.store.get_project(&document.project_id)?;
        let documents = self.store.get_project_documents(&document.project_id)?;
        Ok(LoadedDocument {
            document,
            project,
            documents,
        })
    }

    /// Run a store effect into its result event; host effects come back as `Err`.
    fn execute(&self, effect: Effect) -> Result<Event, Effect> {
        match effect {
            Effect::Load(id) => {
                debug!(document = %id, "loading");
                Ok(match self.load(&id) {
                    Ok(loaded) => Event::Loaded(Box::new(loaded)),
                    Err(error) => Event::LoadFailed {
                        document_id: id,
                        error,
                    },
                })
            }
            Effect::Persist(save) => {
                let result = self.store.update_document(&save.document_id, &save.update);
                Ok(Event::Saved {
                    document_id: save.document_id,
                    revision: save.revision,
                    result,
                })
            }
            Effect::PersistMany(saves) => Ok(Event::SavedAll(persist_all(&self.store, saves))),
            Effect::PersistStatus {
                document_id,
                status,
            } => {
                let result = self
                    .store
                    .update_document(&document_id, &DocumentUpdate::status(status));
                Ok(Event::StatusSaved {
                    document_id,
                    status,
                    result,
                })
            }
            other => Err(other),
        }
    }
}
