use tracing::{debug, warn};

use spantag_core::model::DocumentSummary;
use spantag_core::projection::sorted_order;
use spantag_core::session::{project_route, LeaveDecision, Notice};
use spantag_core::{
    CursorState, DocumentId, DocumentStore, Driver, Effect, Entity, Event, Route, Session,
    TextRange,
};

use crate::store::FileStore;

/// Which screen the terminal shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Project,
    Document,
}

/// Terminal host state around one annotation session
pub struct App {
    pub session: Session,
    driver: Driver<FileStore>,
    pub cursor: CursorState,
    pub screen: Screen,
    pub running: bool,

    // Visual selection anchor, as a character offset
    pub anchor: Option<usize>,

    // Sorted index of the focused entity, painted or not
    pub focused: Option<usize>,

    // Popover list position within the filtered classes
    pub popover_selected: usize,

    // Project listing
    pub listing: Vec<DocumentSummary>,
    pub listing_selected: usize,

    pub status_message: Option<String>,
}

impl App {
    pub fn new(session: Session, store: FileStore) -> Self {
        let mut app = Self {
            session,
            driver: Driver::new(store),
            cursor: CursorState::new(),
            screen: Screen::Project,
            running: true,
            anchor: None,
            focused: None,
            popover_selected: 0,
            listing: Vec::new(),
            listing_selected: 0,
            status_message: None,
        };
        app.refresh_listing();
        app
    }

    pub fn store(&self) -> &FileStore {
        self.driver.store()
    }

    /// Feed one event through the session and apply what comes back
    pub fn dispatch(&mut self, event: Event) {
        let before = self.session.document_id().cloned();
        let effects = self.driver.dispatch(&mut self.session, event);

        if self.session.document_id() != before.as_ref() {
            self.sync_document();
        }
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Navigate(Route::Document(id)) => {
                debug!(document = %id, "showing document");
                self.screen = Screen::Document;
            }
            Effect::Navigate(Route::Project(_)) | Effect::Navigate(Route::Projects) => {
                self.screen = Screen::Project;
                self.refresh_listing();
            }
            Effect::Navigate(Route::Exit) => self.running = false,
            Effect::PromptLeave => {}
            Effect::ClearSelection => self.anchor = None,
            Effect::Notify(Notice::Success(message)) => self.set_status(&message),
            Effect::Notify(Notice::Failure(failure)) => self.set_status(&failure.to_string()),
            Effect::Load(_)
            | Effect::Persist(_)
            | Effect::PersistMany(_)
            | Effect::PersistStatus { .. } => {
                warn!(?effect, "store effect reached the host");
            }
        }
    }

    fn sync_document(&mut self) {
        self.cursor.set_content(self.session.text().unwrap_or_default());
        self.anchor = None;
        self.focused = None;
        self.popover_selected = 0;
    }

    fn refresh_listing(&mut self) {
        let store = self.driver.store();
        match store.get_project_documents(&store.project().id) {
            Ok(listing) => {
                self.listing = listing;
                self.listing_selected = self.listing_selected.min(self.listing.len().saturating_sub(1));
            }
            Err(err) => self.set_status(&format!("Error: {err}")),
        }
    }

    // Project screen

    pub fn open(&mut self, id: DocumentId) {
        self.screen = Screen::Document;
        self.dispatch(Event::Open(id));
    }

    pub fn open_selected(&mut self) {
        if let Some(doc) = self.listing.get(self.listing_selected) {
            let id = doc.id.clone();
            self.open(id);
        }
    }

    pub fn next_listed(&mut self) {
        if !self.listing.is_empty() {
            self.listing_selected = (self.listing_selected + 1) % self.listing.len();
        }
    }

    pub fn prev_listed(&mut self) {
        let count = self.listing.len();
        if count > 0 {
            self.listing_selected = if self.listing_selected == 0 {
                count - 1
            } else {
                self.listing_selected - 1
            };
        }
    }

    // Visual selection

    pub fn enter_visual_mode(&mut self) {
        self.anchor = Some(self.cursor.offset());
    }

    pub fn exit_visual_mode(&mut self) {
        self.anchor = None;
    }

    /// Selected range for highlighting, end exclusive
    pub fn selection_range(&self) -> Option<TextRange> {
        let anchor = self.anchor?;
        Some(TextRange::new(anchor, self.cursor.offset()))
    }

    /// Label the visual selection with the active class
    pub fn add_selection(&mut self) {
        let Some(range) = self.selection_range() else {
            return;
        };
        if self.session.active_class().is_none() {
            self.set_status("Choose a class first (1-9)");
            return;
        }
        if range.is_empty() {
            self.set_status("Selection is empty");
            return;
        }

        self.dispatch(Event::SelectRange(range));
        if self.anchor.is_some() {
            self.set_status("Nothing to label in the selection");
        }
    }

    // Entities

    /// Entities in start order, including ones hidden under an earlier span
    pub fn sorted_entities(&self) -> Vec<&Entity> {
        let Some(entities) = self.session.entities() else {
            return Vec::new();
        };
        let slice = entities.as_slice();
        sorted_order(slice).into_iter().map(|index| &slice[index]).collect()
    }

    pub fn focused_entity(&self) -> Option<&Entity> {
        self.sorted_entities().get(self.focused?).copied()
    }

    pub fn focus_next(&mut self) {
        let count = self.sorted_entities().len();
        if count > 0 {
            let next = self.focused.map_or(0, |f| (f + 1) % count);
            self.focus(next);
        }
    }

    pub fn focus_prev(&mut self) {
        let count = self.sorted_entities().len();
        if count > 0 {
            let prev = match self.focused {
                Some(f) if f > 0 && f < count => f - 1,
                _ => count - 1,
            };
            self.focus(prev);
        }
    }

    fn focus(&mut self, sorted_index: usize) {
        let Some(start) = self.sorted_entities().get(sorted_index).map(|e| e.start) else {
            return;
        };
        self.focused = Some(sorted_index);
        self.cursor.set_cursor_offset(start);
    }

    pub fn dismiss_focused(&mut self) {
        let Some(focused) = self.focused else {
            return;
        };
        self.dispatch(Event::Dismiss(focused));
        self.focused = None;
        self.set_status("Entity removed");
    }

    // Popover

    pub fn open_popover(&mut self) {
        if let Some(focused) = self.focused {
            self.popover_selected = 0;
            self.dispatch(Event::OpenPopover(focused));
        }
    }

    pub fn popover_input(&mut self, ch: Option<char>) {
        let Some(popover) = self.session.popover() else {
            return;
        };
        let mut filter = popover.filter.clone();
        match ch {
            Some(ch) => filter.push(ch),
            None => {
                filter.pop();
            }
        }
        self.popover_selected = 0;
        self.dispatch(Event::FilterClasses(filter));
    }

    pub fn popover_next(&mut self) {
        let count = self.session.filtered_classes().len();
        if count > 0 {
            self.popover_selected = (self.popover_selected + 1) % count;
        }
    }

    pub fn popover_prev(&mut self) {
        let count = self.session.filtered_classes().len();
        if count > 0 {
            self.popover_selected = (self.popover_selected + count - 1) % count;
        }
    }

    pub fn pick_class(&mut self) {
        self.dispatch(Event::PickClass(self.popover_selected));
    }

    // Leaving

    /// Back to the project listing, confirming if edits are unsaved
    pub fn back(&mut self) {
        let route = project_route(&self.session);
        self.dispatch(Event::RequestLeave(route));
    }

    /// Exit the annotator, confirming first if any document is unsaved
    pub fn quit(&mut self) {
        if self.session.confirm_unload() {
            debug!(dirty = self.session.dirty_count(), "quit needs confirmation");
        }
        self.dispatch(Event::RequestLeave(Route::Exit));
    }

    pub fn decide(&mut self, decision: LeaveDecision) {
        self.dispatch(Event::Decide(decision));
    }

    pub fn toggle_autosave(&mut self) {
        let enabled = !self.session.autosave();
        self.dispatch(Event::SetAutosave(enabled));
        self.set_status(if enabled { "Autosave on" } else { "Autosave off" });
    }

    /// Set status message
    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Get title for display
    pub fn title(&self) -> String {
        match self.screen {
            Screen::Project => self.store().project().name.clone(),
            Screen::Document => self
                .session
                .document_name()
                .map(str::to_string)
                .or_else(|| self.session.document_id().map(|id| id.to_string()))
                .unwrap_or_else(|| "Untitled".to_string()),
        }
    }
}
