pub mod annotation;
pub mod document;
pub mod entity;
pub mod project;
pub mod text_range;

pub use annotation::{Annotation, EntityRecord};
pub use document::{Document, DocumentId, DocumentStatus, DocumentSummary, DocumentUpdate};
pub use entity::{resolve_color, Entity, EntityClass, FALLBACK_COLOR};
pub use project::{Project, ProjectId};
pub use text_range::{char_len, char_slice, TextRange};
