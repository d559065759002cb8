use serde::{Deserialize, Serialize};

use super::text_range::{char_len, char_slice, TextRange};

/// Display color used for labels that no longer match a project class
pub const FALLBACK_COLOR: &str = "#ffeb3b";

/// A label from the project's ordered class list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityClass {
    pub name: String,
    pub color: String,
}

impl EntityClass {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Resolve the display color for `label`, falling back when no class matches.
pub fn resolve_color(classes: &[EntityClass], label: &str, fallback: &str) -> String {
    classes
        .iter()
        .find(|class| class.name == label)
        .map(|class| class.color.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// An annotated span of one document.
///
/// `text` caches the slice of the document at `[start, end)` taken when the
/// entity was created; document text is immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub text: String,
    pub color: String,
}

impl Entity {
    /// Build an entity covering `range` of `text`.
    ///
    /// Returns `None` for an empty range or one reaching past the end of the text.
    pub fn from_range(text: &str, range: TextRange, class: &EntityClass) -> Option<Self> {
        if range.is_empty() || range.end > char_len(text) {
            return None;
        }

        Some(Self {
            start: range.start,
            end: range.end,
            label: class.name.clone(),
            text: char_slice(text, range).to_string(),
            color: class.color.clone(),
        })
    }

    pub fn range(&self) -> TextRange {
        TextRange::new(self.start, self.end)
    }

    /// Same span under a different class
    pub fn reclassified(&self, class: &EntityClass) -> Self {
        Self {
            label: class.name.clone(),
            color: class.color.clone(),
            ..self.clone()
        }
    }
}
