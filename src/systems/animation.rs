use std::any::Any;

use anyhow::Result;

use crate::components::{Animation, Sprite};
use crate::ecs::{Entity, Registry, Requirements, System, UpdateContext};

/// Steps sprite-sheet animations by the game clock.
#[derive(Debug, Default)]
pub struct AnimationSystem;

impl AnimationSystem {
    pub fn new() -> Self {
        Self
    }
}

/// Frame to show `elapsed_ms` after the animation started.
pub fn frame_at(animation: &Animation, now_ms: u64) -> u32 {
    let elapsed = now_ms.saturating_sub(animation.start_ms);
    let frames_played = elapsed * animation.frame_rate as u64 / 1_000;
    let frames = animation.num_frames.max(1) as u64;
    if animation.looping {
        (frames_played % frames) as u32
    } else {
        frames_played.min(frames - 1) as u32
    }
}

impl System for AnimationSystem {
    fn name(&self) -> &str {
        "animation"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<Sprite>().with::<Animation>();
    }

    fn update(
        &mut self,
        entities: &[Entity],
        registry: &mut Registry,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        for &entity in entities {
            if !registry.has_component::<Sprite>(entity) {
                continue;
            }
            let Ok(animation) = registry.get_component_mut::<Animation>(entity) else {
                continue;
            };
            let frame = frame_at(animation, ctx.elapsed_ms);
            animation.current_frame = frame;

            let sprite = registry.get_component_mut::<Sprite>(entity)?;
            sprite.src.x = frame as i32 * sprite.width as i32;
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
