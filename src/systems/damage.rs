use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::components::{BoxCollider, Health, Projectile};
use crate::ecs::{Entity, EventBus, Registry, Requirements, System};
use crate::events::CollisionEvent;

use super::{ENEMIES_GROUP, PLAYER_TAG, PROJECTILES_GROUP};

/// Running totals kept by the damage handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageStats {
    pub player_hits: u32,
    pub enemy_hits: u32,
    pub kills: u32,
}

impl DamageStats {
    fn on_collision(&mut self, event: &CollisionEvent, registry: &mut Registry) -> Result<()> {
        let (a, b) = (event.a, event.b);
        let is_projectile = |e: Entity| registry.entity_belongs_to_group(e, PROJECTILES_GROUP);
        let is_player = |e: Entity| registry.entity_has_tag(e, PLAYER_TAG);
        let is_enemy = |e: Entity| registry.entity_belongs_to_group(e, ENEMIES_GROUP);

        let hit = if is_projectile(a) && is_player(b) {
            Some((a, b, false))
        } else if is_projectile(b) && is_player(a) {
            Some((b, a, false))
        } else if is_projectile(a) && is_enemy(b) {
            Some((a, b, true))
        } else if is_projectile(b) && is_enemy(a) {
            Some((b, a, true))
        } else {
            None
        };

        match hit {
            Some((projectile, target, friendly_hits)) => {
                self.apply(registry, projectile, target, friendly_hits)
            }
            None => Ok(()),
        }
    }

    /// Projectiles only hurt the side they were not fired by: friendly ones
    /// hit enemies, hostile ones hit the player. Both die on impact.
    ///
    /// A projectile that already hit something this frame, or a target already
    /// going down, takes no further part.
    fn apply(
        &mut self,
        registry: &mut Registry,
        projectile: Entity,
        target: Entity,
        friendly_hits: bool,
    ) -> Result<()> {
        if registry.is_kill_pending(projectile) || registry.is_kill_pending(target) {
            return Ok(());
        }
        let shot = *registry
            .get_component::<Projectile>(projectile)
            .with_context(|| format!("{projectile} is in the projectile group"))?;
        if shot.friendly != friendly_hits {
            return Ok(());
        }

        let health = registry.get_component_mut::<Health>(target)?;
        health.current -= shot.damage;
        let remaining = health.current;
        if friendly_hits {
            self.enemy_hits += 1;
            log::info!("{target} hit, health now {remaining}");
        } else {
            self.player_hits += 1;
            log::info!("player hit, health now {remaining}");
        }

        if remaining <= 0 {
            self.kills += 1;
            registry.destroy_entity(target);
        }
        registry.destroy_entity(projectile);
        Ok(())
    }
}

/// Applies projectile damage when a [`CollisionEvent`] comes in.
#[derive(Debug, Default)]
pub struct DamageSystem {
    stats: Rc<RefCell<DamageStats>>,
}

impl DamageSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DamageStats {
        *self.stats.borrow()
    }
}

impl System for DamageSystem {
    fn name(&self) -> &str {
        "damage"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<BoxCollider>();
    }

    fn subscribe(&self, events: &mut EventBus) {
        events.subscribe_owned(self.stats.clone(), DamageStats::on_collision);
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

    fn projectile(registry: &mut Registry, friendly: bool, damage: i32) -> Entity {
        let e = registry.create_entity();
        registry.group_entity(e, PROJECTILES_GROUP).unwrap();
        registry
            .add_component(
                e,
                Projectile {
                    friendly,
                    damage,
                    duration_ms: 1_000,
                    start_ms: 0,
                },
            )
            .unwrap();
        e
    }

    fn setup() -> (Registry, EventBus, DamageSystem) {
        let registry = Registry::new();
        let mut events = EventBus::new();
        let system = DamageSystem::new();
        system.subscribe(&mut events);
        (registry, events, system)
    }

    #[test]
    fn test_hostile_projectile_hurts_player() {
        let (mut registry, mut events, system) = setup();
        let player = registry.create_entity();
        registry.tag_entity(player, PLAYER_TAG).unwrap();
        registry.add_component(player, Health::full(100)).unwrap();
        let bullet = projectile(&mut registry, false, 30);

        events
            .publish(&mut registry, CollisionEvent { a: player, b: bullet })
            .unwrap();

        assert_eq!(registry.get_component::<Health>(player).unwrap().current, 70);
        assert!(registry.is_kill_pending(bullet));
        assert!(!registry.is_kill_pending(player));
        assert_eq!(system.stats().player_hits, 1);
    }

    #[test]
    fn test_friendly_projectile_ignores_player_and_kills_enemy() {
        let (mut registry, mut events, system) = setup();
        let player = registry.create_entity();
        registry.tag_entity(player, PLAYER_TAG).unwrap();
        registry.add_component(player, Health::full(100)).unwrap();
        let enemy = registry.create_entity();
        registry.group_entity(enemy, ENEMIES_GROUP).unwrap();
        registry.add_component(enemy, Health::full(20)).unwrap();
        let bullet = projectile(&mut registry, true, 25);

        events
            .publish(&mut registry, CollisionEvent { a: bullet, b: player })
            .unwrap();
        assert!(!registry.is_kill_pending(bullet));

        events
            .publish(&mut registry, CollisionEvent { a: enemy, b: bullet })
            .unwrap();
        assert!(registry.is_alive(enemy));
        assert!(registry.is_kill_pending(enemy));
        assert!(registry.is_kill_pending(bullet));
        assert_eq!(
            system.stats(),
            DamageStats {
                player_hits: 0,
                enemy_hits: 1,
                kills: 1
            }
        );
    }

    #[test]
    fn test_projectile_without_payload_is_reported() {
        let (mut registry, mut events, _system) = setup();
        let player = registry.create_entity();
        registry.tag_entity(player, PLAYER_TAG).unwrap();
        let bogus = registry.create_entity();
        registry.group_entity(bogus, PROJECTILES_GROUP).unwrap();

        let err = events
            .publish(&mut registry, CollisionEvent { a: bogus, b: player })
            .unwrap_err();
        assert!(format!("{err:#}").contains("projectile group"));
    }

    #[test]
    fn test_doomed_enemy_is_not_hit_again() {
        let (mut registry, mut events, system) = setup();
        let enemy = registry.create_entity();
        registry.group_entity(enemy, ENEMIES_GROUP).unwrap();
        registry.add_component(enemy, Health::full(20)).unwrap();
        let first = projectile(&mut registry, true, 25);
        let second = projectile(&mut registry, true, 25);

        events
            .publish(&mut registry, CollisionEvent { a: enemy, b: first })
            .unwrap();
        events
            .publish(&mut registry, CollisionEvent { a: enemy, b: second })
            .unwrap();

        assert_eq!(registry.get_component::<Health>(enemy).unwrap().current, -5);
        assert!(!registry.is_kill_pending(second));
        assert_eq!(
            system.stats(),
            DamageStats {
                player_hits: 0,
                enemy_hits: 1,
                kills: 1
            }
        );
    }

    #[test]
    fn test_spent_projectile_hits_only_once() {
        let (mut registry, mut events, system) = setup();
        let bullet = projectile(&mut registry, true, 5);
        let mut enemies = Vec::new();
        for _ in 0..2 {
            let enemy = registry.create_entity();
            registry.group_entity(enemy, ENEMIES_GROUP).unwrap();
            registry.add_component(enemy, Health::full(50)).unwrap();
            enemies.push(enemy);
        }

        for &enemy in &enemies {
            events
                .publish(&mut registry, CollisionEvent { a: enemy, b: bullet })
                .unwrap();
        }

        let health = |e: Entity| registry.get_component::<Health>(e).unwrap().current;
        assert_eq!((health(enemies[0]), health(enemies[1])), (45, 50));
        assert_eq!(system.stats().enemy_hits, 1);
    }
}
