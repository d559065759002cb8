//! Spantag Core - Span annotation engine
//!
//! This crate holds the data model and logic for labelling character spans
//! of a document with entity classes: projecting entities onto the text,
//! mapping selections back to offsets, buffering unsaved edits across
//! documents, and the session controller that drives it all. It performs no
//! I/O of its own; persistence goes through [`DocumentStore`].

pub mod buffer;
pub mod cursor;
pub mod entities;
pub mod error;
pub mod model;
pub mod offset;
pub mod projection;
pub mod session;
pub mod store;

pub use buffer::{BufferState, ChangeBuffer, ChangeSnapshot, PendingSave, SaveOutcome};
pub use cursor::CursorState;
pub use entities::EntitySet;
pub use error::{SaveAllError, SaveError, StoreError};
pub use model::{
    Annotation, Document, DocumentId, DocumentStatus, DocumentSummary, DocumentUpdate, Entity,
    EntityClass, EntityRecord, Project, ProjectId, TextRange,
};
pub use offset::{map_selection, ViewPoint, ViewSelection};
pub use projection::{project, ProjectionCache, Segment};
pub use session::{Driver, Effect, Event, Mode, Phase, Route, Session, SessionConfig};
pub use store::{DocumentStore, MemoryStore};
