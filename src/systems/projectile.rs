use std::any::Any;

use anyhow::Result;

use crate::components::{
    BoxCollider, CameraFollow, Projectile, ProjectileEmitter, Rigidbody, Sprite, Transform, Vec2,
};
use crate::ecs::{Entity, EventBus, Registry, Requirements, System, UpdateContext};
use crate::events::{Key, KeyPressedEvent};

use super::PROJECTILES_GROUP;

pub const BULLET_ASSET: &str = "bullet-image";
const BULLET_SIZE: u32 = 4;
const BULLET_Z_INDEX: i32 = 4;

/// Key that fires manual emitters.
pub const SHOOT_KEY: Key = Key::Z;

/// Fires projectiles: automatic emitters on their repeat interval, manual
/// ones when the shoot key is pressed (only for the camera-followed entity).
#[derive(Debug, Default)]
pub struct ProjectileEmitSystem;

impl ProjectileEmitSystem {
    pub fn new() -> Self {
        Self
    }
}

fn ready(emitter: &ProjectileEmitter, now_ms: u64) -> bool {
    now_ms.saturating_sub(emitter.last_emission_ms) > emitter.repeat_ms
}

/// Spawns one projectile from `source` and restarts its emitter cooldown.
///
/// Manual shots fly along the sign of the shooter's current velocity.
fn emit(registry: &mut Registry, source: Entity, now_ms: u64, manual: bool) -> Result<Entity> {
    let emitter = *registry.get_component::<ProjectileEmitter>(source)?;
    let transform = *registry.get_component::<Transform>(source)?;

    let mut position = transform.position;
    if let Ok(sprite) = registry.get_component::<Sprite>(source) {
        position.x += transform.scale.x * sprite.width as f64 / 2.0;
        position.y += transform.scale.y * sprite.height as f64 / 2.0;
    }

    let mut velocity = emitter.velocity;
    if manual {
        if let Ok(rigidbody) = registry.get_component::<Rigidbody>(source) {
            let heading = rigidbody.velocity;
            velocity = Vec2::new(
                emitter.velocity.x * sign(heading.x),
                emitter.velocity.y * sign(heading.y),
            );
        }
    }

    let projectile = registry.create_entity();
    registry.group_entity(projectile, PROJECTILES_GROUP)?;
    registry.add_component(
        projectile,
        Transform {
            position,
            ..Transform::default()
        },
    )?;
    registry.add_component(projectile, Rigidbody { velocity })?;
    registry.add_component(
        projectile,
        Sprite::new(BULLET_ASSET, BULLET_SIZE, BULLET_SIZE, BULLET_Z_INDEX),
    )?;
    registry.add_component(projectile, BoxCollider::new(BULLET_SIZE, BULLET_SIZE))?;
    registry.add_component(
        projectile,
        Projectile {
            friendly: emitter.friendly,
            damage: emitter.damage,
            duration_ms: emitter.duration_ms,
            start_ms: now_ms,
        },
    )?;

    registry
        .get_component_mut::<ProjectileEmitter>(source)?
        .last_emission_ms = now_ms;
    log::trace!("{source} fired {projectile}");
    Ok(projectile)
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn on_key_pressed(event: &KeyPressedEvent, registry: &mut Registry) -> Result<()> {
    if event.key != SHOOT_KEY {
        return Ok(());
    }
    let emitters = registry.system_entities::<ProjectileEmitSystem>()?.to_vec();
    for entity in emitters {
        if !registry.has_component::<CameraFollow>(entity)
            || !registry.has_component::<Transform>(entity)
        {
            continue;
        }
        let Ok(emitter) = registry.get_component::<ProjectileEmitter>(entity) else {
            continue;
        };
        if emitter.manual && ready(emitter, event.at_ms) {
            emit(registry, entity, event.at_ms, true)?;
        }
    }
    Ok(())
}

impl System for ProjectileEmitSystem {
    fn name(&self) -> &str {
        "projectile_emit"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<ProjectileEmitter>().with::<Transform>();
    }

    fn subscribe(&self, events: &mut EventBus) {
        events.subscribe::<KeyPressedEvent, _>(on_key_pressed);
    }

    fn update(
        &mut self,
        entities: &[Entity],
        registry: &mut Registry,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        for &entity in entities {
            if !registry.has_component::<Transform>(entity) {
                continue;
            }
            let Ok(emitter) = registry.get_component::<ProjectileEmitter>(entity) else {
                continue;
            };
            if !emitter.manual && ready(emitter, ctx.elapsed_ms) {
                emit(registry, entity, ctx.elapsed_ms, false)?;
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Destroys projectiles once their duration has run out.
#[derive(Debug, Default)]
pub struct ProjectileLifecycleSystem;

impl ProjectileLifecycleSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for ProjectileLifecycleSystem {
    fn name(&self) -> &str {
        "projectile_lifecycle"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<Projectile>();
    }

    fn update(
        &mut self,
        entities: &[Entity],
        registry: &mut Registry,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        for &entity in entities {
            let Ok(projectile) = registry.get_component::<Projectile>(entity) else {
                continue;
            };
            if ctx.elapsed_ms.saturating_sub(projectile.start_ms) >= projectile.duration_ms {
                registry.destroy_entity(entity);
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
