//! Systems - per-frame logic over every entity matching a component signature

use std::any::{Any, TypeId};
use std::collections::HashSet;

use anyhow::Result;

use super::{Entity, EventBus, Registry, Requirements, Signature};
use crate::assets::AssetStore;
use crate::render::{Camera, Canvas, MapBounds};

/// Everything a system may touch during the update pass, besides the registry.
pub struct UpdateContext<'a> {
    /// Seconds since the previous frame.
    pub dt: f64,
    /// Game clock in milliseconds, advanced by the frame driver.
    pub elapsed_ms: u64,
    pub events: &'a mut EventBus,
    pub camera: &'a mut Camera,
    pub map: MapBounds,
}

pub struct RenderContext<'a> {
    pub canvas: &'a mut dyn Canvas,
    pub assets: &'a AssetStore,
    pub camera: Camera,
    pub debug: bool,
}

/// A unit of game logic.
///
/// The registry owns every system and its matched entity list. Systems never
/// edit that list; they receive it read-only in `update` and `render`.
pub trait System: Any {
    fn name(&self) -> &str;

    /// Declares the components an entity must have to be handed to this system.
    fn requirements(&self, req: &mut Requirements<'_>);

    /// Registers event handlers. Called by [`Registry::subscribe_to_events`],
    /// which drops them again once the system is removed.
    fn subscribe(&self, _events: &mut EventBus) {}

    fn update(
        &mut self,
        _entities: &[Entity],
        _registry: &mut Registry,
        _ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn render(
        &mut self,
        _entities: &[Entity],
        _registry: &Registry,
        _ctx: &mut RenderContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Registry-side bookkeeping for one registered system.
pub(crate) struct SystemEntry {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) signature: Signature,
    /// Whether this system's handlers are on the bus.
    pub(crate) subscribed: bool,
    entities: Vec<Entity>,
    members: HashSet<Entity>,
    /// `None` while the system is checked out for its own pass.
    pub(crate) system: Option<Box<dyn System>>,
}

impl SystemEntry {
    pub(crate) fn new<S: System>(system: S, signature: Signature) -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>(),
            signature,
            subscribed: false,
            entities: Vec::new(),
            members: HashSet::new(),
            system: Some(Box::new(system)),
        }
    }

    pub(crate) fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn add_entity(&mut self, entity: Entity) {
        if self.members.insert(entity) {
            self.entities.push(entity);
        }
    }

    pub(crate) fn remove_entity(&mut self, entity: Entity) {
        if self.members.remove(&entity) {
            self.entities.retain(|other| *other != entity);
        }
    }

    /// Adds or drops `entity` depending on whether `signature` satisfies this system.
    pub(crate) fn reconcile(&mut self, entity: Entity, signature: Signature) {
        if signature.contains(self.signature) {
            self.add_entity(entity);
        } else {
            self.remove_entity(entity);
        }
    }
}
