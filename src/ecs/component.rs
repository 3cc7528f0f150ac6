//! Packed component pools
//!
//! Each component type gets one [`ComponentPool`]: the values live in a dense
//! `Vec` with no gaps, and two index maps translate between entities and slots.

use std::any::Any;
use std::collections::HashMap;

use super::Entity;

/// Trait for components
pub trait Component: Send + Sync + 'static {}

/// Type-erased component storage, so the registry can keep every pool in one table
pub trait ComponentStorage: Send + Sync {
    /// Drops the entity's value if it has one; no-op otherwise.
    fn remove_entity(&mut self, entity: Entity) -> bool;
    fn contains(&self, entity: Entity) -> bool;
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense storage for a specific component type
pub struct ComponentPool<T: Component> {
    data: Vec<T>,
    entity_to_index: HashMap<Entity, usize>,
    index_to_entity: Vec<Entity>,
}

impl<T: Component> ComponentPool<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            entity_to_index: HashMap::with_capacity(capacity),
            index_to_entity: Vec::with_capacity(capacity),
        }
    }

    /// Insert-or-update. A new entity takes the next dense slot.
    pub fn set(&mut self, entity: Entity, component: T) {
        if let Some(&index) = self.entity_to_index.get(&entity) {
            self.data[index] = component;
            return;
        }
        let index = self.data.len();
        if index == self.data.capacity() {
            log::trace!(
                "pool `{}` growing past {} slots",
                std::any::type_name::<T>(),
                index
            );
        }
        self.data.push(component);
        self.index_to_entity.push(entity);
        self.entity_to_index.insert(entity, index);
    }

    /// Swap-with-last removal; returns the removed value.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let index = self.entity_to_index.remove(&entity)?;
        let last = self.data.len() - 1;
        let removed = self.data.swap_remove(index);
        self.index_to_entity.swap_remove(index);
        if index != last {
            let moved = self.index_to_entity[index];
            self.entity_to_index.insert(moved, index);
        }
        Some(removed)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        let index = *self.entity_to_index.get(&entity)?;
        Some(&self.data[index])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let index = *self.entity_to_index.get(&entity)?;
        Some(&mut self.data[index])
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entity_to_index.contains_key(&entity)
    }

    /// Dense slot currently holding `entity`'s value.
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        self.entity_to_index.get(&entity).copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.entity_to_index.clear();
        self.index_to_entity.clear();
    }

    /// The packed values, in slot order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn entities(&self) -> &[Entity] {
        &self.index_to_entity
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.index_to_entity.iter().copied().zip(self.data.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.index_to_entity.iter().copied().zip(self.data.iter_mut())
    }
}

impl<T: Component> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentStorage for ComponentPool<T> {
    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn contains(&self, entity: Entity) -> bool {
        ComponentPool::contains(self, entity)
    }

    fn clear(&mut self) {
        ComponentPool::clear(self);
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl Component for Position {}

    fn e(id: u32) -> Entity {
        Entity::new(id)
    }

    fn assert_packed(pool: &ComponentPool<Position>) {
        assert_eq!(pool.entities().len(), pool.len());
        for (slot, entity) in pool.entities().iter().enumerate() {
            assert_eq!(pool.index_of(*entity), Some(slot));
        }
    }

    #[test]
    fn test_component_pool() {
        let mut pool = ComponentPool::<Position>::new();

        pool.set(e(1), Position { x: 1.0, y: 2.0 });
        pool.set(e(2), Position { x: 3.0, y: 4.0 });

        assert_eq!(pool.len(), 2);
        assert!(pool.contains(e(1)));
        assert!(pool.contains(e(2)));
        assert!(!pool.contains(e(3)));

        let pos = pool.get(e(1)).unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 2.0);

        pool.remove(e(1));
        assert!(!pool.contains(e(1)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_set_overwrites_existing_value() {
        let mut pool = ComponentPool::<Position>::new();
        pool.set(e(7), Position { x: 1.0, y: 1.0 });
        pool.set(e(7), Position { x: 9.0, y: 9.0 });

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(e(7)), Some(&Position { x: 9.0, y: 9.0 }));
    }

    #[test]
    fn test_remove_moves_last_into_hole() {
        let mut pool = ComponentPool::<Position>::new();
        for id in 0..4 {
            pool.set(e(id), Position { x: id as f32, y: 0.0 });
        }

        pool.remove(e(1));

        assert_eq!(pool.len(), 3);
        assert_eq!(pool.index_of(e(3)), Some(1));
        assert_eq!(pool.as_slice()[1].x, 3.0);
        assert_eq!(pool.get(e(3)).unwrap().x, 3.0);
        assert_packed(&pool);
    }

    #[test]
    fn test_remove_last_and_missing() {
        let mut pool = ComponentPool::<Position>::new();
        pool.set(e(0), Position { x: 0.0, y: 0.0 });
        pool.set(e(1), Position { x: 1.0, y: 0.0 });

        assert!(pool.remove(e(1)).is_some());
        assert!(pool.remove(e(1)).is_none());
        assert!(!ComponentStorage::remove_entity(&mut pool, e(5)));
        assert_eq!(pool.index_of(e(0)), Some(0));
        assert_packed(&pool);

        pool.remove(e(0));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_interleaved_set_and_remove_stay_consistent() {
        let mut pool = ComponentPool::<Position>::new();
        let mut expected: HashMap<Entity, f32> = HashMap::new();

        for step in 0..200u32 {
            let id = e(step * 7 % 23);
            if step % 3 == 0 {
                pool.remove(id);
                expected.remove(&id);
            } else {
                pool.set(id, Position { x: step as f32, y: 0.0 });
                expected.insert(id, step as f32);
            }
            assert_eq!(pool.len(), expected.len());
        }

        for (entity, x) in &expected {
            assert_eq!(pool.get(*entity).unwrap().x, *x);
        }
        assert_packed(&pool);
    }

    #[test]
    fn test_component_iteration() {
        let mut pool = ComponentPool::<Position>::new();

        pool.set(e(1), Position { x: 1.0, y: 2.0 });
        pool.set(e(2), Position { x: 3.0, y: 4.0 });

        let count = pool.iter().count();
        assert_eq!(count, 2);

        for (_id, pos) in pool.iter_mut() {
            pos.x += 1.0;
        }

        let pos = pool.get(e(1)).unwrap();
        assert_eq!(pos.x, 2.0);
    }

    #[test]
    fn test_type_erased_access() {
        let mut boxed: Box<dyn ComponentStorage> = Box::new(ComponentPool::<Position>::new());
        boxed
            .as_any_mut()
            .downcast_mut::<ComponentPool<Position>>()
            .unwrap()
            .set(e(4), Position { x: 0.5, y: 0.5 });

        assert!(boxed.contains(e(4)));
        assert_eq!(boxed.len(), 1);
        boxed.clear();
        assert!(boxed.is_empty());
    }
}
