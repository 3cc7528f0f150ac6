use std::any::Any;

use anyhow::Result;

use crate::components::{CameraFollow, Transform};
use crate::ecs::{Entity, Registry, Requirements, System, UpdateContext};

/// Centers the camera on the followed entity without showing past the map edge.
#[derive(Debug, Default)]
pub struct CameraMovementSystem;

impl CameraMovementSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for CameraMovementSystem {
    fn name(&self) -> &str {
        "camera_movement"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<CameraFollow>().with::<Transform>();
    }

    fn update(
        &mut self,
        entities: &[Entity],
        registry: &mut Registry,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        let camera = &mut *ctx.camera;
        let max_x = (ctx.map.width as i32 - camera.width).max(0);
        let max_y = (ctx.map.height as i32 - camera.height).max(0);

        for &entity in entities {
            let Ok(transform) = registry.get_component::<Transform>(entity) else {
                continue;
            };
            let position = transform.position;
            camera.x = (position.x as i32 - camera.width / 2).clamp(0, max_x);
            camera.y = (position.y as i32 - camera.height / 2).clamp(0, max_y);
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
