use crate::buffer::PendingSave;
use crate::error::StoreError;
use crate::model::{Document, DocumentId, DocumentStatus, DocumentSummary, Project, ProjectId, TextRange};
use crate::offset::ViewSelection;
use crate::store::SaveResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    fn step(self) -> isize {
        match self {
            Direction::Previous => -1,
            Direction::Next => 1,
        }
    }

    /// Adjacent index within `0..len`, if any
    pub fn apply(self, index: usize, len: usize) -> Option<usize> {
        index
            .checked_add_signed(self.step())
            .filter(|&next| next < len)
    }
}

/// Where the host should take the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Document(DocumentId),
    Project(ProjectId),
    Projects,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    SaveAndLeave,
    DiscardAndLeave,
    Cancel,
}

/// Everything fetched to show one document
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: Document,
    pub project: Project,
    pub documents: Vec<DocumentSummary>,
}

/// Input to [`Session::handle`](super::Session::handle)
#[derive(Debug)]
pub enum Event {
    Open(DocumentId),
    Loaded(Box<LoadedDocument>),
    LoadFailed {
        document_id: DocumentId,
        error: StoreError,
    },

    /// Text selected on a surface painted from the projection
    SelectText(ViewSelection),
    /// Text selected by absolute offsets
    SelectRange(TextRange),
    ChooseClass(usize),
    /// Raw key press; digits `1`-`9` choose a class
    Key(char),

    /// Annotated segment clicked, by sorted index
    OpenPopover(usize),
    FilterClasses(String),
    /// Class picked from the filtered popover list
    PickClass(usize),
    ClosePopover,
    /// Dismiss control of an annotated segment, by sorted index
    Dismiss(usize),

    ToggleComplete,
    StatusSaved {
        document_id: DocumentId,
        status: DocumentStatus,
        result: Result<(), StoreError>,
    },

    Navigate(Direction),
    Save,
    SaveAll,
    Saved {
        document_id: DocumentId,
        revision: u64,
        result: Result<(), StoreError>,
    },
    SavedAll(Vec<SaveResult>),

    RequestLeave(Route),
    Decide(LeaveDecision),
    SetAutosave(bool),
}

/// Work the session asks its host to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Load(DocumentId),
    Persist(PendingSave),
    PersistMany(Vec<PendingSave>),
    PersistStatus {
        document_id: DocumentId,
        status: DocumentStatus,
    },
    Navigate(Route),
    PromptLeave,
    ClearSelection,
    Notify(Notice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(Failure),
}

/// User-visible failures; none of them escape into rendering
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    #[error("Error loading document: {0}")]
    Load(String),
    #[error("Failed to save document {document_id}: {message}")]
    Save {
        document_id: DocumentId,
        message: String,
    },
    #[error("Failed to save {} document(s); {saved} saved", .failed.len())]
    SaveAll {
        failed: Vec<DocumentId>,
        saved: usize,
    },
    #[error("Failed to update document status: {0}")]
    Status(String),
}
