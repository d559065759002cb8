//! Renderer projection: document text plus entities to paintable segments.
//!
//! Entities are walked in stable start order. Overlaps resolve first-sorted-wins:
//! the cursor into the text only moves forward, an entity starting inside an
//! earlier one is clipped to begin where that one ended, and an entity fully
//! covered by earlier ones produces no segment. Concatenating segment texts
//! therefore always reproduces the document.

use std::sync::Arc;

use crate::model::{char_len, char_slice, Entity, TextRange};

/// A contiguous run of document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal {
        range: TextRange,
        text: String,
    },
    Annotated {
        range: TextRange,
        text: String,
        /// Position of the entity in start order, used for click targeting
        sorted_index: usize,
        /// Position of the entity in insertion order
        entity_index: usize,
        label: String,
        color: String,
    },
}

impl Segment {
    pub fn range(&self) -> TextRange {
        match self {
            Segment::Literal { range, .. } | Segment::Annotated { range, .. } => *range,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Segment::Literal { text, .. } | Segment::Annotated { text, .. } => text,
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.range().len()
    }

    pub fn is_empty(&self) -> bool {
        self.range().is_empty()
    }

    pub fn sorted_index(&self) -> Option<usize> {
        match self {
            Segment::Annotated { sorted_index, .. } => Some(*sorted_index),
            Segment::Literal { .. } => None,
        }
    }
}

/// Insertion indices of `entities` in stable start order
pub fn sorted_order(entities: &[Entity]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entities.len()).collect();
    order.sort_by_key(|&i| entities[i].start);
    order
}

pub fn project(text: &str, entities: &[Entity]) -> Vec<Segment> {
    let len = char_len(text);
    let mut segments = Vec::with_capacity(entities.len() * 2 + 1);
    let mut last = 0;

    for (sorted_index, &entity_index) in sorted_order(entities).iter().enumerate() {
        let entity = &entities[entity_index];
        let start = entity.start.max(last);
        let end = entity.end.min(len);
        if start >= end {
            continue;
        }

        if start > last {
            segments.push(literal(text, TextRange::new(last, start)));
        }

        let range = TextRange::new(start, end);
        segments.push(Segment::Annotated {
            range,
            text: char_slice(text, range).to_string(),
            sorted_index,
            entity_index,
            label: entity.label.clone(),
            color: entity.color.clone(),
        });
        last = end;
    }

    if last < len {
        segments.push(literal(text, TextRange::new(last, len)));
    }

    segments
}

fn literal(text: &str, range: TextRange) -> Segment {
    Segment::Literal {
        range,
        text: char_slice(text, range).to_string(),
    }
}

/// Memoizes the last projection by identity of its inputs
#[derive(Debug)]
pub struct ProjectionCache {
    key: Option<(Arc<str>, Arc<[Entity]>)>,
    segments: Arc<[Segment]>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self {
            key: None,
            segments: Arc::from(Vec::new()),
        }
    }

    pub fn get(&mut self, text: &Arc<str>, entities: &Arc<[Entity]>) -> Arc<[Segment]> {
        if let Some((cached_text, cached_entities)) = &self.key {
            if Arc::ptr_eq(cached_text, text) && Arc::ptr_eq(cached_entities, entities) {
                return Arc::clone(&self.segments);
            }
        }

        let segments: Arc<[Segment]> = project(text, entities).into();
        self.key = Some((Arc::clone(text), Arc::clone(entities)));
        self.segments = Arc::clone(&segments);
        segments
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.segments = Arc::from(Vec::new());
    }
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityClass;

    fn entity(text: &str, start: usize, end: usize, label: &str) -> Entity {
        Entity::from_range(text, TextRange::new(start, end), &EntityClass::new(label, "#ff0000"))
            .unwrap()
    }

    fn joined(segments: &[Segment]) -> String {
        segments.iter().map(Segment::text).collect()
    }

    #[test]
    fn test_scenario_single_entity() {
        let text = "Barack Obama was president.";
        let segments = project(text, &[entity(text, 0, 12, "PERSON")]);

        assert_eq!(segments.len(), 2);
        assert!(matches!(
            &segments[0],
            Segment::Annotated { text, sorted_index: 0, color, .. }
                if text == "Barack Obama" && color == "#ff0000"
        ));
        assert!(matches!(
            &segments[1],
            Segment::Literal { text, .. } if text == " was president."
        ));
    }

    #[test]
    fn test_sorted_index_differs_from_insertion_index() {
        let text = "Barack Obama was president.";
        let entities = vec![entity(text, 17, 26, "ROLE"), entity(text, 0, 6, "PERSON")];
        let segments = project(text, &entities);

        let annotated: Vec<_> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Annotated { sorted_index, entity_index, label, .. } => {
                    Some((*sorted_index, *entity_index, label.as_str()))
                }
                _ => None,
            })
            .collect();

        assert_eq!(annotated, vec![(0, 1, "PERSON"), (1, 0, "ROLE")]);
        assert_eq!(joined(&segments), text);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let text = "abcdef";
        let entities = vec![entity(text, 2, 4, "B"), entity(text, 2, 3, "A")];
        assert_eq!(sorted_order(&entities), vec![0, 1]);
    }

    #[test]
    fn test_overlap_clips_later_entity() {
        let text = "New York City";
        let entities = vec![entity(text, 0, 8, "CITY"), entity(text, 4, 13, "PLACE")];
        let segments = project(text, &entities);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text(), "New York");
        assert_eq!(segments[1].text(), " City");
        assert_eq!(segments[1].sorted_index(), Some(1));
        assert_eq!(joined(&segments), text);
    }

    #[test]
    fn test_nested_entity_is_hidden() {
        let text = "New York City";
        let entities = vec![entity(text, 0, 13, "CITY"), entity(text, 4, 8, "STATE")];
        let segments = project(text, &entities);

        assert_eq!(segments.len(), 1);
        assert_eq!(joined(&segments), text);
    }

    #[test]
    fn test_entity_past_end_is_clamped() {
        let text = "short";
        let mut long = entity(text, 0, 5, "X");
        long.end = 40;
        let segments = project(text, &[long]);

        assert_eq!(joined(&segments), text);
    }

    #[test]
    fn test_empty_text() {
        assert!(project("", &[]).is_empty());
    }

    #[test]
    fn test_cache_reuses_identical_inputs() {
        let text: Arc<str> = Arc::from("Barack Obama");
        let entities: Arc<[Entity]> = vec![entity(&text, 0, 6, "PERSON")].into();
        let mut cache = ProjectionCache::new();

        let first = cache.get(&text, &entities);
        let second = cache.get(&text, &entities);
        assert!(Arc::ptr_eq(&first, &second));

        let changed: Arc<[Entity]> = Vec::new().into();
        let third = cache.get(&text, &changed);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.len(), 1);
    }
}
