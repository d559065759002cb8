use std::sync::Arc;

use crate::buffer::ChangeSnapshot;
use crate::model::{Entity, EntityClass};

/// The entities of one document in insertion order.
///
/// Edits never mutate in place: each returns a new set sharing nothing with
/// the old one, so snapshots handed out earlier stay valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySet {
    entities: Arc<[Entity]>,
}

impl EntitySet {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities: entities.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    /// Shared handle used for identity-based memoization
    pub fn shared(&self) -> &Arc<[Entity]> {
        &self.entities
    }

    pub fn snapshot(&self) -> ChangeSnapshot {
        ChangeSnapshot::new(Arc::clone(&self.entities))
    }

    /// Append an entity. Duplicates and overlaps are accepted.
    pub fn add(&self, entity: Entity) -> Self {
        let mut entities = self.entities.to_vec();
        entities.push(entity);
        Self::new(entities)
    }

    /// Remove the entity at `index`; `None` when out of range.
    pub fn remove(&self, index: usize) -> Option<Self> {
        if index >= self.entities.len() {
            return None;
        }
        let mut entities = self.entities.to_vec();
        entities.remove(index);
        Some(Self::new(entities))
    }

    /// Relabel the entity at `index`, keeping its span and text.
    pub fn reclassify(&self, index: usize, class: &EntityClass) -> Option<Self> {
        let target = self.entities.get(index)?;
        let mut entities = self.entities.to_vec();
        entities[index] = target.reclassified(class);
        Some(Self::new(entities))
    }
}

impl Default for EntitySet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Entity>> for EntitySet {
    fn from(entities: Vec<Entity>) -> Self {
        Self::new(entities)
    }
}
