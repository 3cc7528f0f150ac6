//! Registry - owner of entities, component pools, signatures, systems, tags and groups

use std::any::{type_name, TypeId};
use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};

use super::component::ComponentStorage;
use super::entity::EntityAllocator;
use super::system::SystemEntry;
use super::{
    CommandBuffer, Component, ComponentId, ComponentPool, ComponentTypes, EcsError, Entity,
    EventBus, RenderContext, Requirements, Signature, System, UpdateContext,
};

/// Central ECS container
///
/// Every structural change goes through here. Creation, destruction and
/// component edits that alter an entity's signature are staged in a
/// [`CommandBuffer`] and only reach system entity lists inside [`Registry::update`].
pub struct Registry {
    entities: EntityAllocator,
    types: ComponentTypes,
    /// Indexed by [`ComponentId`]; a slot stays `None` until its type is first stored.
    pools: Vec<Option<Box<dyn ComponentStorage>>>,
    /// Indexed by entity id.
    signatures: Vec<Signature>,
    /// Registration order is execution order.
    systems: Vec<SystemEntry>,
    /// Removed systems whose handlers are still on the bus.
    retired: Vec<TypeId>,
    commands: CommandBuffer,
    entity_per_tag: HashMap<String, Entity>,
    tag_per_entity: HashMap<Entity, String>,
    entities_per_group: HashMap<String, BTreeSet<Entity>>,
    group_per_entity: HashMap<Entity, String>,
}

impl Registry {
    pub fn new() -> Self {
        log::debug!("registry created");
        Self {
            entities: EntityAllocator::new(),
            types: ComponentTypes::new(),
            pools: Vec::new(),
            signatures: Vec::new(),
            systems: Vec::new(),
            retired: Vec::new(),
            commands: CommandBuffer::new(),
            entity_per_tag: HashMap::new(),
            tag_per_entity: HashMap::new(),
            entities_per_group: HashMap::new(),
            group_per_entity: HashMap::new(),
        }
    }

    /// Hands out a fresh or recycled id. The entity joins systems at the next update.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.allocate();
        if self.signatures.len() <= entity.index() {
            self.signatures.resize(entity.index() + 1, Signature::EMPTY);
        }
        debug_assert!(self.signatures[entity.index()].is_empty());
        self.commands.spawn(entity);
        log::debug!("{entity} created");
        entity
    }

    /// Queues `entity` for destruction at the end of the next update.
    pub fn destroy_entity(&mut self, entity: Entity) {
        if !self.entities.is_alive(entity) {
            log::warn!("ignoring destroy of {entity}: not alive");
            return;
        }
        if self.commands.kill(entity) {
            log::debug!("{entity} queued for destruction");
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// True when `entity`'s id sits in the free queue waiting to be recycled.
    pub fn is_free(&self, entity: Entity) -> bool {
        self.entities.is_free(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.count()
    }

    /// Live entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    pub fn is_spawn_pending(&self, entity: Entity) -> bool {
        self.commands.is_spawn_pending(entity)
    }

    pub fn is_kill_pending(&self, entity: Entity) -> bool {
        self.commands.is_kill_pending(entity)
    }

    pub fn pending_spawns(&self) -> usize {
        self.commands.pending_spawns()
    }

    pub fn pending_kills(&self) -> usize {
        self.commands.pending_kills()
    }

    /// Current component signature; empty for ids that were never handed out.
    pub fn signature(&self, entity: Entity) -> Signature {
        self.signatures
            .get(entity.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn component_types(&self) -> &ComponentTypes {
        &self.types
    }

    /// Inserts or overwrites `entity`'s `T`, creating `T`'s pool on first use.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), EcsError> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        let id = self.types.register::<T>()?;
        self.pool_or_insert::<T>(id).set(entity, component);

        let signature = &mut self.signatures[entity.index()];
        if !signature.test(id) {
            signature.set(id);
            self.commands.mark_changed(entity);
            log::trace!("{entity} gained `{}`", type_name::<T>());
        }
        Ok(())
    }

    /// Detaches and returns `entity`'s `T`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        let missing = EcsError::MissingComponent {
            entity,
            component: type_name::<T>(),
        };
        let Some(id) = self.types.id_of::<T>() else {
            return Err(missing);
        };
        let removed = self
            .pool_mut::<T>()
            .and_then(|pool| pool.remove(entity))
            .ok_or(missing)?;

        self.signatures[entity.index()].unset(id);
        self.commands.mark_changed(entity);
        log::trace!("{entity} lost `{}`", type_name::<T>());
        Ok(removed)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.pool::<T>().is_some_and(|pool| pool.contains(entity))
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.pool::<T>()
            .and_then(|pool| pool.get(entity))
            .ok_or(EcsError::MissingComponent {
                entity,
                component: type_name::<T>(),
            })
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.pool_mut::<T>()
            .and_then(|pool| pool.get_mut(entity))
            .ok_or(EcsError::MissingComponent {
                entity,
                component: type_name::<T>(),
            })
    }

    /// Typed view of `T`'s pool, if any `T` was ever stored.
    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        let id = self.types.id_of::<T>()?;
        self.pools
            .get(id.index())?
            .as_ref()?
            .as_any()
            .downcast_ref::<ComponentPool<T>>()
    }

    /// Mutable pool access. Values may be edited in place; adding or removing
    /// entries must go through the registry so signatures stay in step.
    pub(crate) fn pool_mut<T: Component>(&mut self) -> Option<&mut ComponentPool<T>> {
        let id = self.types.id_of::<T>()?;
        self.pools
            .get_mut(id.index())?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
    }

    fn pool_or_insert<T: Component>(&mut self, id: ComponentId) -> &mut ComponentPool<T> {
        let slot = id.index();
        if self.pools.len() <= slot {
            self.pools.resize_with(slot + 1, || None);
        }
        self.pools[slot]
            .get_or_insert_with(|| {
                log::trace!("created pool for `{}`", type_name::<T>());
                Box::new(ComponentPool::<T>::new()) as Box<dyn ComponentStorage>
            })
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
            .expect("component pool stored under the wrong id")
    }

    /// Registers `system`, one instance per type.
    ///
    /// Entities that are already live and synchronized are enrolled right away,
    /// so a system added mid-game sees the current world.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<(), EcsError> {
        if self.has_system::<S>() {
            return Err(EcsError::SystemAlreadyRegistered(type_name::<S>()));
        }
        let mut requirements = Requirements::new(&mut self.types);
        system.requirements(&mut requirements);
        let signature = requirements.finish()?;

        let mut entry = SystemEntry::new(system, signature);
        for entity in self.entities.iter() {
            if self.commands.is_spawn_pending(entity) || self.commands.is_kill_pending(entity) {
                continue;
            }
            entry.reconcile(entity, self.signatures[entity.index()]);
        }
        log::info!(
            "system `{}` registered (requires {} component(s), {} entities matched)",
            entry.type_name,
            signature.count(),
            entry.entities().len()
        );
        self.systems.push(entry);
        Ok(())
    }

    pub fn remove_system<S: System>(&mut self) -> Result<(), EcsError> {
        let index = self
            .system_index(TypeId::of::<S>())
            .ok_or(EcsError::MissingSystem(type_name::<S>()))?;
        if self.systems[index].system.is_none() {
            return Err(EcsError::SystemBusy(type_name::<S>()));
        }
        let entry = self.systems.remove(index);
        if entry.subscribed {
            self.retired.push(entry.type_id);
        }
        log::info!("system `{}` removed", type_name::<S>());
        Ok(())
    }

    pub fn has_system<S: System>(&self) -> bool {
        self.system_index(TypeId::of::<S>()).is_some()
    }

    pub fn get_system<S: System>(&self) -> Result<&S, EcsError> {
        let entry = self.entry::<S>()?;
        entry
            .system
            .as_ref()
            .ok_or(EcsError::SystemBusy(type_name::<S>()))?
            .as_any()
            .downcast_ref::<S>()
            .ok_or(EcsError::MissingSystem(type_name::<S>()))
    }

    pub fn get_system_mut<S: System>(&mut self) -> Result<&mut S, EcsError> {
        let index = self
            .system_index(TypeId::of::<S>())
            .ok_or(EcsError::MissingSystem(type_name::<S>()))?;
        self.systems[index]
            .system
            .as_mut()
            .ok_or(EcsError::SystemBusy(type_name::<S>()))?
            .as_any_mut()
            .downcast_mut::<S>()
            .ok_or(EcsError::MissingSystem(type_name::<S>()))
    }

    /// The entities `S` currently matches, as of the last synchronization.
    pub fn system_entities<S: System>(&self) -> Result<&[Entity], EcsError> {
        Ok(self.entry::<S>()?.entities())
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Brings `events` in line with the registered systems: handlers of
    /// removed systems are dropped and systems not yet subscribed hook theirs in.
    ///
    /// Safe to call repeatedly; a system subscribes once per registration.
    pub fn subscribe_to_events(&mut self, events: &mut EventBus) {
        for type_id in self.retired.drain(..) {
            events.unsubscribe_owner(type_id);
        }
        for entry in &mut self.systems {
            if entry.subscribed {
                continue;
            }
            let Some(system) = entry.system.as_ref() else {
                continue;
            };
            events.subscribe_for(entry.type_id, |bus| system.subscribe(bus));
            entry.subscribed = true;
            log::debug!("system `{}` subscribed to events", entry.type_name);
        }
    }

    fn entry<S: System>(&self) -> Result<&SystemEntry, EcsError> {
        self.system_index(TypeId::of::<S>())
            .map(|index| &self.systems[index])
            .ok_or(EcsError::MissingSystem(type_name::<S>()))
    }

    fn system_index(&self, type_id: TypeId) -> Option<usize> {
        self.systems.iter().position(|entry| entry.type_id == type_id)
    }

    /// Puts a checked-out system back into its slot.
    fn restore_system(&mut self, type_id: TypeId, system: Box<dyn System>) {
        match self.system_index(type_id) {
            Some(index) => self.systems[index].system = Some(system),
            None => log::warn!("system `{}` vanished during its own pass", system.name()),
        }
    }

    /// Gives `entity` the unique `tag`. A previous owner of the tag loses it,
    /// and `entity` drops whatever tag it had before.
    pub fn tag_entity(&mut self, entity: Entity, tag: impl Into<String>) -> Result<(), EcsError> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        let tag = tag.into();
        self.remove_entity_tag(entity);
        if let Some(previous) = self.entity_per_tag.insert(tag.clone(), entity) {
            self.tag_per_entity.remove(&previous);
            log::debug!("tag `{tag}` moved from {previous} to {entity}");
        }
        self.tag_per_entity.insert(entity, tag);
        Ok(())
    }

    pub fn entity_has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.tag_per_entity
            .get(&entity)
            .is_some_and(|owned| owned == tag)
    }

    pub fn entity_by_tag(&self, tag: &str) -> Result<Entity, EcsError> {
        self.entity_per_tag
            .get(tag)
            .copied()
            .ok_or_else(|| EcsError::TagNotFound(tag.to_owned()))
    }

    pub fn tag_of(&self, entity: Entity) -> Option<&str> {
        self.tag_per_entity.get(&entity).map(String::as_str)
    }

    /// Returns the tag `entity` held, if any.
    pub fn remove_entity_tag(&mut self, entity: Entity) -> Option<String> {
        let tag = self.tag_per_entity.remove(&entity)?;
        self.entity_per_tag.remove(&tag);
        Some(tag)
    }

    /// Puts `entity` in `group`, moving it out of any group it was in.
    pub fn group_entity(&mut self, entity: Entity, group: impl Into<String>) -> Result<(), EcsError> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        let group = group.into();
        if self.group_of(entity) == Some(group.as_str()) {
            return Ok(());
        }
        self.remove_entity_group(entity);
        self.entities_per_group
            .entry(group.clone())
            .or_default()
            .insert(entity);
        self.group_per_entity.insert(entity, group);
        Ok(())
    }

    pub fn entity_belongs_to_group(&self, entity: Entity, group: &str) -> bool {
        self.group_of(entity) == Some(group)
    }

    /// Members of `group` in id order. A group exists once anything joined it,
    /// even if it has since emptied out.
    pub fn entities_by_group(&self, group: &str) -> Result<Vec<Entity>, EcsError> {
        self.entities_per_group
            .get(group)
            .map(|members| members.iter().copied().collect())
            .ok_or_else(|| EcsError::GroupNotFound(group.to_owned()))
    }

    pub fn group_of(&self, entity: Entity) -> Option<&str> {
        self.group_per_entity.get(&entity).map(String::as_str)
    }

    /// Returns the group `entity` was in, if any.
    pub fn remove_entity_group(&mut self, entity: Entity) -> Option<String> {
        let group = self.group_per_entity.remove(&entity)?;
        if let Some(members) = self.entities_per_group.get_mut(&group) {
            members.remove(&entity);
        }
        Some(group)
    }

    /// One simulation step: synchronize membership, run every system's update
    /// in registration order, then commit queued destructions.
    ///
    /// A failing system aborts the step; its destructions stay queued.
    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        self.sync_membership();

        for type_id in self.system_order() {
            let Some((mut system, entities)) = self.check_out(type_id) else {
                continue;
            };
            let result = system
                .update(&entities, self, ctx)
                .with_context(|| format!("system `{}` failed to update", system.name()));
            self.restore_system(type_id, system);
            result?;
        }

        self.commit_kills();
        Ok(())
    }

    /// Runs every system's render pass in registration order. Queued changes
    /// are left alone.
    pub fn render(&mut self, ctx: &mut RenderContext<'_>) -> Result<()> {
        for type_id in self.system_order() {
            let Some((mut system, entities)) = self.check_out(type_id) else {
                continue;
            };
            let result = system
                .render(&entities, self, ctx)
                .with_context(|| format!("system `{}` failed to render", system.name()));
            self.restore_system(type_id, system);
            result?;
        }
        Ok(())
    }

    fn system_order(&self) -> Vec<TypeId> {
        self.systems.iter().map(|entry| entry.type_id).collect()
    }

    fn check_out(&mut self, type_id: TypeId) -> Option<(Box<dyn System>, Vec<Entity>)> {
        let index = self.system_index(type_id)?;
        let entry = &mut self.systems[index];
        let system = entry.system.take()?;
        Some((system, entry.entities().to_vec()))
    }

    fn sync_membership(&mut self) {
        for entity in self.commands.take_membership_changes() {
            if !self.entities.is_alive(entity) {
                continue;
            }
            let signature = self.signatures[entity.index()];
            for entry in &mut self.systems {
                entry.reconcile(entity, signature);
            }
        }
    }

    fn commit_kills(&mut self) {
        for entity in self.commands.take_kills() {
            if !self.entities.is_alive(entity) {
                continue;
            }
            for entry in &mut self.systems {
                entry.remove_entity(entity);
            }
            self.signatures[entity.index()].reset();
            for pool in self.pools.iter_mut().flatten() {
                pool.remove_entity(entity);
            }
            self.remove_entity_tag(entity);
            self.remove_entity_group(entity);
            self.commands.forget(entity);
            self.entities.deallocate(entity);
            log::debug!("{entity} destroyed");
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
