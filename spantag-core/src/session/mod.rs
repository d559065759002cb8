//! Session controller.
//!
//! One `Session` lives from opening the annotator until the user leaves it.
//! Hosts feed it [`Event`]s; every call returns the [`Effect`]s to run, and
//! results of I/O effects come back as further events. The session itself
//! never performs I/O.
//!
//! # Invariants
//! - The change buffer spans every document visited in the session.
//! - Remote writes commit locally only on success (saves clear dirty state,
//!   status toggles update the committed status).
//! - Responses for a document that is no longer being loaded are ignored.

mod driver;
mod event;

use std::sync::Arc;

use tracing::{debug, info, warn};

pub use driver::Driver;
pub use event::{Direction, Effect, Event, Failure, LeaveDecision, LoadedDocument, Notice, Route};

use crate::buffer::{BufferState, ChangeBuffer};
use crate::entities::EntitySet;
use crate::model::annotation::from_annotations;
use crate::model::{
    DocumentId, DocumentStatus, DocumentSummary, EntityClass, Project, ProjectId, TextRange,
    FALLBACK_COLOR,
};
use crate::offset;
use crate::projection::{sorted_order, ProjectionCache, Segment};

/// Session preferences fixed at construction, except `autosave`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Save the current document before moving to another one
    pub autosave: bool,
    pub fallback_color: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave: false,
            fallback_color: FALLBACK_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading(DocumentId),
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Popover,
    ConfirmLeave,
}

/// Reclassification popover state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popover {
    /// Sorted index of the annotated segment that opened it
    pub focused: usize,
    pub filter: String,
}

/// Navigation waiting on a save
#[derive(Debug, Clone, PartialEq, Eq)]
enum Gate {
    Save { document_id: DocumentId, route: Route },
    SaveAll { route: Route },
}

#[derive(Debug, Clone)]
struct OpenDocument {
    id: DocumentId,
    project_id: ProjectId,
    name: Option<String>,
    text: Arc<str>,
    status: DocumentStatus,
    pending_status: Option<DocumentStatus>,
    entities: EntitySet,
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    phase: Phase,
    mode: Mode,
    document: Option<OpenDocument>,
    project: Option<Project>,
    documents: Vec<DocumentSummary>,
    active_class: Option<usize>,
    popover: Option<Popover>,
    pending_route: Option<Route>,
    gate: Option<Gate>,
    buffer: ChangeBuffer,
    projection: ProjectionCache,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            mode: Mode::Normal,
            document: None,
            project: None,
            documents: Vec::new(),
            active_class: None,
            popover: None,
            pending_route: None,
            gate: None,
            buffer: ChangeBuffer::new(),
            projection: ProjectionCache::new(),
        }
    }

    // Queries

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn autosave(&self) -> bool {
        self.config.autosave
    }

    pub fn document_id(&self) -> Option<&DocumentId> {
        self.document.as_ref().map(|doc| &doc.id)
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.as_ref().and_then(|doc| doc.name.as_deref())
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        self.document.as_ref().map(|doc| &*doc.text)
    }

    pub fn entities(&self) -> Option<&EntitySet> {
        self.document.as_ref().map(|doc| &doc.entities)
    }

    pub fn classes(&self) -> &[EntityClass] {
        self.project
            .as_ref()
            .map(|p| p.entity_classes.as_slice())
            .unwrap_or(&[])
    }

    pub fn active_class(&self) -> Option<&EntityClass> {
        self.classes().get(self.active_class?)
    }

    pub fn active_class_index(&self) -> Option<usize> {
        self.active_class
    }

    pub fn popover(&self) -> Option<&Popover> {
        self.popover.as_ref()
    }

    /// Classes whose name contains the popover filter, ignoring case
    pub fn filtered_classes(&self) -> Vec<&EntityClass> {
        let filter = self
            .popover
            .as_ref()
            .map(|p| p.filter.to_lowercase())
            .unwrap_or_default();
        self.classes()
            .iter()
            .filter(|class| class.name.to_lowercase().contains(&filter))
            .collect()
    }

    pub fn pending_route(&self) -> Option<&Route> {
        self.pending_route.as_ref()
    }

    /// Status to display, including a toggle still being written
    pub fn displayed_status(&self) -> Option<DocumentStatus> {
        self.document
            .as_ref()
            .map(|doc| doc.pending_status.unwrap_or(doc.status))
    }

    pub fn committed_status(&self) -> Option<DocumentStatus> {
        self.document.as_ref().map(|doc| doc.status)
    }

    pub fn is_dirty(&self) -> bool {
        self.document_id()
            .is_some_and(|id| self.buffer.is_dirty(id))
    }

    pub fn dirty_count(&self) -> usize {
        self.buffer.dirty_count()
    }

    pub fn buffer(&self) -> &ChangeBuffer {
        &self.buffer
    }

    pub fn buffer_view(&self) -> Arc<BufferState> {
        self.buffer.view()
    }

    /// Whether closing the host right now needs the user's confirmation
    pub fn confirm_unload(&self) -> bool {
        self.buffer.dirty_count() > 0
    }

    /// Index of the current document in the project listing and its length
    pub fn position(&self) -> Option<(usize, usize)> {
        let id = self.document_id()?;
        let index = self.documents.iter().position(|doc| &doc.id == id)?;
        Some((index, self.documents.len()))
    }

    pub fn can_navigate(&self, direction: Direction) -> bool {
        self.adjacent(direction).is_some()
    }

    /// Projected segments of the current document
    pub fn segments(&mut self) -> Arc<[Segment]> {
        match &self.document {
            Some(doc) => self.projection.get(&doc.text, doc.entities.shared()),
            None => Arc::from(Vec::new()),
        }
    }

    // Dispatch

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Open(id) => self.open(id),
            Event::Loaded(loaded) => self.loaded(*loaded),
            Event::LoadFailed { document_id, error } => self.load_failed(document_id, error.to_string()),

            Event::SelectText(selection) => {
                if !self.interactive() {
                    return Vec::new();
                }
                let segments = self.segments();
                let entity = self.text().and_then(|text| {
                    offset::map_selection(text, &segments, &selection, self.active_class())
                });
                self.add_entity(entity)
            }
            Event::SelectRange(range) => self.select_range(range),
            Event::ChooseClass(index) => {
                self.choose_class(index);
                Vec::new()
            }
            Event::Key(key) => {
                if self.mode == Mode::Normal {
                    if let Some(digit) = key.to_digit(10).filter(|d| (1..=9).contains(d)) {
                        self.choose_class(digit as usize - 1);
                    }
                }
                Vec::new()
            }

            Event::OpenPopover(sorted_index) => {
                if self.interactive() && sorted_index < self.entity_count() {
                    self.popover = Some(Popover {
                        focused: sorted_index,
                        filter: String::new(),
                    });
                    self.mode = Mode::Popover;
                }
                Vec::new()
            }
            Event::FilterClasses(filter) => {
                if let Some(popover) = self.popover.as_mut() {
                    popover.filter = filter;
                }
                Vec::new()
            }
            Event::PickClass(index) => {
                self.pick_class(index);
                Vec::new()
            }
            Event::ClosePopover => {
                self.close_popover();
                Vec::new()
            }
            Event::Dismiss(sorted_index) => {
                self.dismiss(sorted_index);
                Vec::new()
            }

            Event::ToggleComplete => self.toggle_complete(),
            Event::StatusSaved {
                document_id,
                status,
                result,
            } => self.status_saved(document_id, status, result),

            Event::Navigate(direction) => self.navigate(direction),
            Event::Save => self.save(),
            Event::SaveAll => {
                if !self.interactive() {
                    return Vec::new();
                }
                self.save_all()
            }
            Event::Saved {
                document_id,
                revision,
                result,
            } => self.saved(document_id, revision, result),
            Event::SavedAll(results) => self.saved_all(results),

            Event::RequestLeave(route) => self.request_leave(route),
            Event::Decide(decision) => self.decide(decision),
            Event::SetAutosave(enabled) => {
                self.config.autosave = enabled;
                Vec::new()
            }
        }
    }

    /// Tear down the session, dropping any unsaved edits
    pub fn close(&mut self) -> usize {
        let dropped = self.buffer.discard();
        self.reset_document();
        self.phase = Phase::Idle;
        self.active_class = None;
        self.pending_route = None;
        self.gate = None;
        dropped
    }

    fn interactive(&self) -> bool {
        self.phase == Phase::Ready && self.mode == Mode::Normal
    }

    fn entity_count(&self) -> usize {
        self.entities().map(EntitySet::len).unwrap_or(0)
    }

    fn reset_document(&mut self) {
        self.document = None;
        self.project = None;
        self.documents.clear();
        self.popover = None;
        self.mode = Mode::Normal;
        self.projection.clear();
    }

    // Loading

    fn open(&mut self, id: DocumentId) -> Vec<Effect> {
        debug!(document = %id, "opening document");
        self.phase = Phase::Loading(id.clone());
        self.popover = None;
        self.mode = Mode::Normal;
        vec![Effect::Load(id)]
    }

    fn go_to(&mut self, id: DocumentId) -> Vec<Effect> {
        let mut effects = vec![Effect::Navigate(Route::Document(id.clone()))];
        effects.extend(self.open(id));
        effects
    }

    fn loaded(&mut self, loaded: LoadedDocument) -> Vec<Effect> {
        let LoadedDocument {
            document,
            project,
            documents,
        } = loaded;

        if self.phase != Phase::Loading(document.id.clone()) {
            debug!(document = %document.id, "ignoring stale load");
            return Vec::new();
        }

        if self.project.as_ref().map(|p| &p.id) != Some(&project.id) {
            self.active_class = None;
        }

        // Unsaved edits from earlier in the session win over the stored copy.
        let entities = match self.buffer.snapshot(&document.id) {
            Some(snapshot) => snapshot.to_set(),
            None => {
                let set = EntitySet::new(from_annotations(
                    &document.annotations,
                    &project.entity_classes,
                    &self.config.fallback_color,
                ));
                self.buffer.seed(&document.id, &set);
                set
            }
        };

        info!(document = %document.id, entities = entities.len(), "document ready");
        self.document = Some(OpenDocument {
            id: document.id,
            project_id: document.project_id,
            name: document.name,
            text: Arc::from(document.text),
            status: document.status,
            pending_status: None,
            entities,
        });
        self.project = Some(project);
        self.documents = documents;
        self.phase = Phase::Ready;
        Vec::new()
    }

    fn load_failed(&mut self, id: DocumentId, message: String) -> Vec<Effect> {
        if self.phase != Phase::Loading(id.clone()) {
            debug!(document = %id, "ignoring stale load failure");
            return Vec::new();
        }

        warn!(document = %id, error = %message, "failed to load document");
        self.reset_document();
        self.phase = Phase::Failed;
        vec![
            Effect::Notify(Notice::Failure(Failure::Load(message))),
            Effect::Navigate(Route::Projects),
        ]
    }

    // Editing

    fn choose_class(&mut self, index: usize) {
        if index < self.classes().len() {
            self.active_class = Some(index);
        }
    }

    fn select_range(&mut self, range: TextRange) -> Vec<Effect> {
        if !self.interactive() {
            return Vec::new();
        }
        let entity = match (self.text(), self.active_class()) {
            (Some(text), Some(class)) => offset::entity_for_range(text, range, class),
            _ => None,
        };
        self.add_entity(entity)
    }

    fn add_entity(&mut self, entity: Option<crate::model::Entity>) -> Vec<Effect> {
        let Some(entity) = entity else {
            return Vec::new();
        };
        let Some(entities) = self.entities() else {
            return Vec::new();
        };
        debug!(start = entity.start, end = entity.end, label = %entity.label, "adding entity");
        let updated = entities.add(entity);
        self.apply_edit(updated);
        vec![Effect::ClearSelection]
    }

    /// Insertion index of the entity at `sorted_index`
    fn insertion_index(&self, sorted_index: usize) -> Option<usize> {
        let entities = self.entities()?;
        sorted_order(entities.as_slice()).get(sorted_index).copied()
    }

    fn dismiss(&mut self, sorted_index: usize) {
        if !self.interactive() {
            return;
        }
        let updated = self
            .insertion_index(sorted_index)
            .and_then(|index| self.entities()?.remove(index));
        if let Some(updated) = updated {
            self.apply_edit(updated);
        }
    }

    fn pick_class(&mut self, filtered_index: usize) {
        let Some(popover) = &self.popover else {
            return;
        };
        let class = self.filtered_classes().get(filtered_index).map(|c| (*c).clone());
        let updated = class.and_then(|class| {
            let index = self.insertion_index(popover.focused)?;
            self.entities()?.reclassify(index, &class)
        });
        if let Some(updated) = updated {
            self.apply_edit(updated);
        }
        self.close_popover();
    }

    fn close_popover(&mut self) {
        self.popover = None;
        if self.mode == Mode::Popover {
            self.mode = Mode::Normal;
        }
    }

    fn apply_edit(&mut self, entities: EntitySet) {
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        self.buffer.record_edit(&doc.id, &entities);
        doc.entities = entities;
    }

    // Completion status

    fn toggle_complete(&mut self) -> Vec<Effect> {
        if !self.interactive() {
            return Vec::new();
        }
        let Some(doc) = self.document.as_mut() else {
            return Vec::new();
        };
        if doc.pending_status.is_some() {
            return Vec::new();
        }

        let status = doc.status.toggled();
        doc.pending_status = Some(status);
        vec![Effect::PersistStatus {
            document_id: doc.id.clone(),
            status,
        }]
    }

    fn status_saved(
        &mut self,
        id: DocumentId,
        status: DocumentStatus,
        result: Result<(), crate::error::StoreError>,
    ) -> Vec<Effect> {
        let current = self
            .document
            .as_mut()
            .filter(|doc| doc.id == id && doc.pending_status == Some(status));

        match (current, result) {
            (Some(doc), Ok(())) => {
                doc.pending_status = None;
                doc.status = status;
                info!(document = %id, status = status.as_str(), "status updated");
                let message = if status.is_completed() {
                    "Document marked as complete"
                } else {
                    "Document marked as in progress"
                };
                vec![Effect::Notify(Notice::Success(message.to_string()))]
            }
            (Some(doc), Err(err)) => {
                doc.pending_status = None;
                warn!(document = %id, error = %err, "status update failed");
                vec![Effect::Notify(Notice::Failure(Failure::Status(err.to_string())))]
            }
            (None, result) => {
                debug!(document = %id, ok = result.is_ok(), "status response for a document no longer shown");
                Vec::new()
            }
        }
    }

    // Saving and navigation

    fn adjacent(&self, direction: Direction) -> Option<DocumentId> {
        let (index, len) = self.position()?;
        let next = direction.apply(index, len)?;
        Some(self.documents[next].id.clone())
    }

    fn navigate(&mut self, direction: Direction) -> Vec<Effect> {
        if !self.interactive() || self.gate.is_some() {
            return Vec::new();
        }
        let Some(next) = self.adjacent(direction) else {
            return Vec::new();
        };
        let Some(current) = self.document_id().cloned() else {
            return Vec::new();
        };

        if self.config.autosave {
            if let Some(pending) = self.buffer.begin_save(&current) {
                info!(document = %current, "autosaving before navigation");
                self.gate = Some(Gate::Save {
                    document_id: current,
                    route: Route::Document(next),
                });
                return vec![Effect::Persist(pending)];
            }
        }

        self.go_to(next)
    }

    fn save(&mut self) -> Vec<Effect> {
        if !self.interactive() {
            return Vec::new();
        }
        self.document_id()
            .and_then(|id| self.buffer.begin_save(id))
            .map(|pending| vec![Effect::Persist(pending)])
            .unwrap_or_default()
    }

    fn save_all(&mut self) -> Vec<Effect> {
        let pending = self.buffer.begin_save_all();
        if pending.is_empty() {
            return Vec::new();
        }
        vec![Effect::PersistMany(pending)]
    }

    fn saved(
        &mut self,
        id: DocumentId,
        revision: u64,
        result: Result<(), crate::error::StoreError>,
    ) -> Vec<Effect> {
        let mut effects = match result {
            Ok(()) => {
                self.buffer.complete_save(&id, revision);
                vec![Effect::Notify(Notice::Success("Changes saved successfully".to_string()))]
            }
            Err(err) => {
                warn!(document = %id, error = %err, "save failed, edits kept");
                vec![Effect::Notify(Notice::Failure(Failure::Save {
                    document_id: id.clone(),
                    message: err.to_string(),
                }))]
            }
        };

        // Autosave navigation proceeds either way; failed edits stay buffered.
        if matches!(&self.gate, Some(Gate::Save { document_id, .. }) if *document_id == id) {
            if let Some(Gate::Save { route, .. }) = self.gate.take() {
                effects.extend(self.leave(route));
            }
        }
        effects
    }

    fn saved_all(&mut self, results: Vec<crate::store::SaveResult>) -> Vec<Effect> {
        let gate = match self.gate.take() {
            Some(Gate::SaveAll { route }) => Some(route),
            other => {
                self.gate = other;
                None
            }
        };

        match self.buffer.finish_save_all(results) {
            Ok(_) => {
                let mut effects = vec![Effect::Notify(Notice::Success(
                    "All documents saved successfully".to_string(),
                ))];
                if let Some(route) = gate {
                    effects.extend(self.leave(route));
                }
                effects
            }
            Err(err) => vec![Effect::Notify(Notice::Failure(Failure::SaveAll {
                failed: err.failed_ids(),
                saved: err.saved,
            }))],
        }
    }

    // Leaving

    fn request_leave(&mut self, route: Route) -> Vec<Effect> {
        if let Route::Document(id) = route {
            return self.go_to(id);
        }
        if self.confirm_unload() {
            self.popover = None;
            self.pending_route = Some(route);
            self.mode = Mode::ConfirmLeave;
            return vec![Effect::PromptLeave];
        }
        self.leave(route)
    }

    fn decide(&mut self, decision: LeaveDecision) -> Vec<Effect> {
        if self.mode != Mode::ConfirmLeave {
            return Vec::new();
        }
        self.mode = Mode::Normal;
        let Some(route) = self.pending_route.take() else {
            return Vec::new();
        };

        match decision {
            LeaveDecision::Cancel => Vec::new(),
            LeaveDecision::DiscardAndLeave => {
                self.buffer.discard();
                self.leave(route)
            }
            LeaveDecision::SaveAndLeave => {
                let pending = self.buffer.begin_save_all();
                if pending.is_empty() {
                    return self.leave(route);
                }
                self.gate = Some(Gate::SaveAll { route });
                vec![Effect::PersistMany(pending)]
            }
        }
    }

    fn leave(&mut self, route: Route) -> Vec<Effect> {
        match route {
            Route::Document(id) => self.go_to(id),
            route => {
                info!(?route, "leaving annotator");
                self.reset_document();
                self.phase = Phase::Idle;
                vec![Effect::Navigate(route)]
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// Route back to the project of the current document, if one is open
pub fn project_route(session: &Session) -> Route {
    session
        .document
        .as_ref()
        .map(|doc| Route::Project(doc.project_id.clone()))
        .unwrap_or(Route::Projects)
}

#[cfg(test)]
mod tests;
