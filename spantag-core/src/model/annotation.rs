//! Persisted shapes of an entity and the conversions at the storage boundary.
//!
//! `Entity` is the only in-memory representation; the wire annotation
//! (`start_index`/`end_index`/`entity`) and the colorless view record
//! (`start`/`end`/`label`) are produced here and nowhere else.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::entity::{resolve_color, Entity, EntityClass};

/// Wire shape of an annotation as stored with a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotation {
    pub start_index: usize,
    pub end_index: usize,
    pub entity: String,
    pub text: String,
}

/// View shape of an entity without its display color
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRecord {
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub text: String,
}

impl From<&Entity> for Annotation {
    fn from(entity: &Entity) -> Self {
        Self {
            start_index: entity.start,
            end_index: entity.end,
            entity: entity.label.clone(),
            text: entity.text.clone(),
        }
    }
}

impl From<&Entity> for EntityRecord {
    fn from(entity: &Entity) -> Self {
        Self {
            start: entity.start,
            end: entity.end,
            label: entity.label.clone(),
            text: entity.text.clone(),
        }
    }
}

pub fn to_annotations(entities: &[Entity]) -> Vec<Annotation> {
    entities.iter().map(Annotation::from).collect()
}

pub fn to_records(entities: &[Entity]) -> Vec<EntityRecord> {
    entities.iter().map(EntityRecord::from).collect()
}

/// Rebuild entities from persisted annotations, re-deriving colors.
///
/// Annotations with an empty or inverted span are dropped.
pub fn from_annotations(
    annotations: &[Annotation],
    classes: &[EntityClass],
    fallback_color: &str,
) -> Vec<Entity> {
    annotations
        .iter()
        .filter_map(|ann| {
            if ann.end_index <= ann.start_index {
                warn!(
                    start = ann.start_index,
                    end = ann.end_index,
                    label = %ann.entity,
                    "dropping annotation with empty span"
                );
                return None;
            }
            Some(Entity {
                start: ann.start_index,
                end: ann.end_index,
                label: ann.entity.clone(),
                text: ann.text.clone(),
                color: resolve_color(classes, &ann.entity, fallback_color),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FALLBACK_COLOR;

    fn entity() -> Entity {
        Entity {
            start: 0,
            end: 12,
            label: "PERSON".to_string(),
            text: "Barack Obama".to_string(),
            color: "#ff0000".to_string(),
        }
    }

    #[test]
    fn test_annotation_wire_format() {
        let json = serde_json::to_string(&Annotation::from(&entity())).unwrap();

        assert!(json.contains("\"start_index\":0"));
        assert!(json.contains("\"end_index\":12"));
        assert!(json.contains("\"entity\":\"PERSON\""));
        assert!(json.contains("\"text\":\"Barack Obama\""));
        assert!(!json.contains("color"));
    }

    #[test]
    fn test_record_format_has_no_color() {
        let json = serde_json::to_string(&EntityRecord::from(&entity())).unwrap();

        assert!(json.contains("\"start\":0"));
        assert!(json.contains("\"label\":\"PERSON\""));
        assert!(!json.contains("color"));
    }

    #[test]
    fn test_from_annotations_resolves_colors() {
        let classes = vec![EntityClass::new("PERSON", "#ff0000")];
        let annotations = vec![
            Annotation::from(&entity()),
            Annotation {
                start_index: 13,
                end_index: 16,
                entity: "RETIRED".to_string(),
                text: "was".to_string(),
            },
            Annotation {
                start_index: 5,
                end_index: 5,
                entity: "PERSON".to_string(),
                text: String::new(),
            },
        ];

        let entities = from_annotations(&annotations, &classes, FALLBACK_COLOR);

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0], entity());
        assert_eq!(entities[1].color, FALLBACK_COLOR);
    }
}
