use std::any::Any;

use anyhow::Result;

use crate::components::{KeyboardControlled, Rigidbody, Sprite};
use crate::ecs::{EventBus, Registry, Requirements, System};
use crate::events::{Direction, KeyPressedEvent};

/// Steers keyboard-controlled entities: arrow keys or WASD set the velocity
/// and pick the matching sprite-sheet row.
#[derive(Debug, Default)]
pub struct KeyboardControlSystem;

impl KeyboardControlSystem {
    pub fn new() -> Self {
        Self
    }
}

fn on_key_pressed(event: &KeyPressedEvent, registry: &mut Registry) -> Result<()> {
    let Some(direction) = event.key.direction() else {
        return Ok(());
    };
    let controlled = registry.system_entities::<KeyboardControlSystem>()?.to_vec();
    for entity in controlled {
        if !registry.has_component::<Rigidbody>(entity)
            || !registry.has_component::<Sprite>(entity)
        {
            continue;
        }
        let Ok(&control) = registry.get_component::<KeyboardControlled>(entity) else {
            continue;
        };
        let velocity = match direction {
            Direction::Up => control.up,
            Direction::Right => control.right,
            Direction::Down => control.down,
            Direction::Left => control.left,
        };
        registry.get_component_mut::<Rigidbody>(entity)?.velocity = velocity;

        let sprite = registry.get_component_mut::<Sprite>(entity)?;
        sprite.src.y = sprite.height as i32 * direction.sheet_row();
    }
    Ok(())
}

impl System for KeyboardControlSystem {
    fn name(&self) -> &str {
        "keyboard_control"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<KeyboardControlled>()
            .with::<Sprite>()
            .with::<Rigidbody>();
    }

    fn subscribe(&self, events: &mut EventBus) {
        events.subscribe::<KeyPressedEvent, _>(on_key_pressed);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
