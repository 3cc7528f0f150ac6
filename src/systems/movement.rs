use std::any::Any;

use anyhow::Result;

use crate::components::{Rigidbody, Sprite, Transform};
use crate::ecs::{Entity, EventBus, Registry, Requirements, System, UpdateContext};
use crate::events::CollisionEvent;
use crate::render::Flip;

use super::{ENEMIES_GROUP, OBSTACLES_GROUP, PLAYER_TAG};

/// Distance past the map edge at which non-player entities are destroyed.
const OUTSIDE_MARGIN: f64 = 100.0;

/// Player clamp padding: left, top, right, bottom.
const PLAYER_PADDING: (f64, f64, f64, f64) = (10.0, 10.0, 50.0, 50.0);

/// Integrates velocity into position.
///
/// The player is kept inside the map; anything else that drifts far outside
/// it is destroyed. Enemies bounce off obstacles.
#[derive(Debug, Default)]
pub struct MovementSystem;

impl MovementSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<Transform>().with::<Sprite>().with::<Rigidbody>();
    }

    fn subscribe(&self, events: &mut EventBus) {
        events.subscribe::<CollisionEvent, _>(on_collision);
    }

    fn update(
        &mut self,
        entities: &[Entity],
        registry: &mut Registry,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        for &entity in entities {
            let Ok(rigidbody) = registry.get_component::<Rigidbody>(entity) else {
                continue;
            };
            let velocity = rigidbody.velocity;
            let is_player = registry.entity_has_tag(entity, PLAYER_TAG);

            let Ok(transform) = registry.get_component_mut::<Transform>(entity) else {
                continue;
            };
            transform.position += velocity * ctx.dt;

            let position = &mut transform.position;
            if is_player {
                let (left, top, right, bottom) = PLAYER_PADDING;
                position.x = position.x.min(ctx.map.width - right).max(left);
                position.y = position.y.min(ctx.map.height - bottom).max(top);
                continue;
            }

            let outside = position.x < -OUTSIDE_MARGIN
                || position.x > ctx.map.width + OUTSIDE_MARGIN
                || position.y < -OUTSIDE_MARGIN
                || position.y > ctx.map.height + OUTSIDE_MARGIN;
            if outside {
                log::debug!("{entity} left the map");
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

fn on_collision(event: &CollisionEvent, registry: &mut Registry) -> Result<()> {
    let (a, b) = (event.a, event.b);
    if registry.entity_belongs_to_group(a, ENEMIES_GROUP)
        && registry.entity_belongs_to_group(b, OBSTACLES_GROUP)
    {
        bounce(registry, a)
    } else if registry.entity_belongs_to_group(b, ENEMIES_GROUP)
        && registry.entity_belongs_to_group(a, OBSTACLES_GROUP)
    {
        bounce(registry, b)
    } else {
        Ok(())
    }
}

/// Reverses the enemy along each moving axis and mirrors its sprite.
fn bounce(registry: &mut Registry, enemy: Entity) -> Result<()> {
    if !registry.has_component::<Rigidbody>(enemy) || !registry.has_component::<Sprite>(enemy) {
        return Ok(());
    }
    let mut flip = registry.get_component::<Sprite>(enemy)?.flip;
    let rigidbody = registry.get_component_mut::<Rigidbody>(enemy)?;
    if rigidbody.velocity.x != 0.0 {
        rigidbody.velocity.x = -rigidbody.velocity.x;
        flip = flip.toggled(Flip::Horizontal);
    }
    if rigidbody.velocity.y != 0.0 {
        rigidbody.velocity.y = -rigidbody.velocity.y;
        flip = flip.toggled(Flip::Vertical);
    }
    registry.get_component_mut::<Sprite>(enemy)?.flip = flip;
    Ok(())
}
