//! Entity management

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// Raw numeric id backing an [`Entity`].
pub type EntityId = u32;

/// Entity handle - a plain id with no data and no link back to its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(EntityId);

impl Entity {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }

    pub fn id(self) -> EntityId {
        self.0
    }

    /// Slot of this entity in per-entity tables.
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Entity allocator
///
/// Freed ids go to the back of a FIFO queue and are handed out again from the
/// front, so the most recently destroyed id is the last one to be recycled.
pub struct EntityAllocator {
    next_id: EntityId,
    free_ids: VecDeque<EntityId>,
    alive: BTreeSet<Entity>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            free_ids: VecDeque::new(),
            alive: BTreeSet::new(),
        }
    }

    pub fn allocate(&mut self) -> Entity {
        let id = if let Some(id) = self.free_ids.pop_front() {
            id
        } else {
            let id = self.next_id;
            self.next_id += 1;
            id
        };
        let entity = Entity::new(id);
        self.alive.insert(entity);
        entity
    }

    /// Returns the id to the free queue. Returns `false` if it was not alive.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if self.alive.remove(&entity) {
            self.free_ids.push_back(entity.id());
            true
        } else {
            false
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.contains(&entity)
    }

    pub fn is_free(&self, entity: Entity) -> bool {
        self.free_ids.contains(&entity.id())
    }

    pub fn count(&self) -> usize {
        self.alive.len()
    }

    /// Number of id slots ever handed out (live + free).
    pub fn capacity(&self) -> usize {
        self.next_id as usize
    }

    /// Live entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive.iter().copied()
    }

    pub fn free_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.free_ids.iter().copied()
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
