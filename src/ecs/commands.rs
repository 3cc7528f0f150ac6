//! Structural changes staged during a frame and applied at the next sync

use std::collections::BTreeSet;

use super::Entity;

/// Pending entity creation/destruction plus the entities whose signature
/// changed since the last sync.
///
/// Ordered sets keep the merge deterministic: entities are committed in id order.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    spawned: BTreeSet<Entity>,
    killed: BTreeSet<Entity>,
    changed: BTreeSet<Entity>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: Entity) {
        self.spawned.insert(entity);
    }

    /// Returns `false` if the entity was already queued.
    pub fn kill(&mut self, entity: Entity) -> bool {
        self.killed.insert(entity)
    }

    pub fn mark_changed(&mut self, entity: Entity) {
        self.changed.insert(entity);
    }

    pub fn is_spawn_pending(&self, entity: Entity) -> bool {
        self.spawned.contains(&entity)
    }

    pub fn is_kill_pending(&self, entity: Entity) -> bool {
        self.killed.contains(&entity)
    }

    pub fn pending_spawns(&self) -> usize {
        self.spawned.len()
    }

    pub fn pending_kills(&self) -> usize {
        self.killed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.killed.is_empty() && self.changed.is_empty()
    }

    /// Drains everything that needs a membership check: new entities first,
    /// then entities whose components changed.
    pub(crate) fn take_membership_changes(&mut self) -> Vec<Entity> {
        let spawned = std::mem::take(&mut self.spawned);
        let changed = std::mem::take(&mut self.changed);
        spawned
            .iter()
            .copied()
            .chain(changed.into_iter().filter(|e| !spawned.contains(e)))
            .collect()
    }

    pub(crate) fn take_kills(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.killed).into_iter().collect()
    }

    /// Forgets any queued work for an entity that is about to be recycled.
    pub(crate) fn forget(&mut self, entity: Entity) {
        self.spawned.remove(&entity);
        self.changed.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.spawned.clear();
        self.killed.clear();
        self.changed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_changes_are_deduplicated() {
        let mut buffer = CommandBuffer::new();
        buffer.spawn(Entity::new(3));
        buffer.spawn(Entity::new(1));
        buffer.mark_changed(Entity::new(3));
        buffer.mark_changed(Entity::new(0));

        let changes = buffer.take_membership_changes();
        assert_eq!(
            changes,
            vec![Entity::new(1), Entity::new(3), Entity::new(0)]
        );
        assert_eq!(buffer.pending_spawns(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_kill_is_idempotent() {
        let mut buffer = CommandBuffer::new();
        assert!(buffer.kill(Entity::new(2)));
        assert!(!buffer.kill(Entity::new(2)));
        assert_eq!(buffer.pending_kills(), 1);
        assert_eq!(buffer.take_kills(), vec![Entity::new(2)]);
        assert!(!buffer.is_kill_pending(Entity::new(2)));
    }
}
