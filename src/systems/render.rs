//! Render-pass systems. None of them has update logic.

use std::any::Any;

use anyhow::Result;

use crate::components::{BoxCollider, Health, Sprite, TextLabel, Transform};
use crate::ecs::{Entity, Registry, RenderContext, Requirements, System};
use crate::render::{Color, DrawCommand, Rect};

pub const HEALTH_FONT: &str = "pico8-font-8";
const HEALTH_BAR_WIDTH: i32 = 15;
const HEALTH_BAR_HEIGHT: i32 = 3;

/// Draws sprites back to front by z-index.
#[derive(Debug, Default)]
pub struct RenderSystem;

impl RenderSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for RenderSystem {
    fn name(&self) -> &str {
        "render"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<Transform>().with::<Sprite>();
    }

    fn render(
        &mut self,
        entities: &[Entity],
        registry: &Registry,
        ctx: &mut RenderContext<'_>,
    ) -> Result<()> {
        let mut drawables: Vec<_> = entities
            .iter()
            .filter_map(|&entity| {
                Some((
                    registry.get_component::<Transform>(entity).ok()?,
                    registry.get_component::<Sprite>(entity).ok()?,
                ))
            })
            .collect();
        drawables.sort_by_key(|(_, sprite)| sprite.z_index);

        for (transform, sprite) in drawables {
            if ctx.assets.texture(&sprite.asset_id).is_none() {
                log::debug!("skipping sprite with unknown texture `{}`", sprite.asset_id);
                continue;
            }
            let (cam_x, cam_y) = if sprite.fixed {
                (0, 0)
            } else {
                (ctx.camera.x, ctx.camera.y)
            };
            let dst = Rect::new(
                transform.position.x as i32 - cam_x,
                transform.position.y as i32 - cam_y,
                (sprite.width as f64 * transform.scale.x) as i32,
                (sprite.height as f64 * transform.scale.y) as i32,
            );
            ctx.canvas.draw(DrawCommand::Sprite {
                asset_id: sprite.asset_id.clone(),
                src: sprite.src,
                dst,
                rotation: transform.rotation,
                flip: sprite.flip,
            });
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

/// Outlines colliders in red while debug drawing is on.
#[derive(Debug, Default)]
pub struct RenderColliderSystem;

impl RenderColliderSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for RenderColliderSystem {
    fn name(&self) -> &str {
        "render_collider"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<Transform>().with::<BoxCollider>();
    }

    fn render(
        &mut self,
        entities: &[Entity],
        registry: &Registry,
        ctx: &mut RenderContext<'_>,
    ) -> Result<()> {
        if !ctx.debug {
            return Ok(());
        }
        for &entity in entities {
            let (Ok(transform), Ok(collider)) = (
                registry.get_component::<Transform>(entity),
                registry.get_component::<BoxCollider>(entity),
            ) else {
                continue;
            };
            let (origin, size) = collider.bounds(transform);
            ctx.canvas.draw(DrawCommand::Rect {
                rect: Rect::new(
                    origin.x as i32 - ctx.camera.x,
                    origin.y as i32 - ctx.camera.y,
                    size.x as i32,
                    size.y as i32,
                ),
                color: Color::RED,
                filled: false,
            });
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

#[derive(Debug, Default)]
pub struct RenderTextSystem;

impl RenderTextSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for RenderTextSystem {
    fn name(&self) -> &str {
        "render_text"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<TextLabel>();
    }

    fn render(
        &mut self,
        entities: &[Entity],
        registry: &Registry,
        ctx: &mut RenderContext<'_>,
    ) -> Result<()> {
        for &entity in entities {
            let Ok(label) = registry.get_component::<TextLabel>(entity) else {
                continue;
            };
            if ctx.assets.font(&label.font_id).is_none() {
                log::debug!("skipping label with unknown font `{}`", label.font_id);
                continue;
            }
            let (cam_x, cam_y) = if label.fixed {
                (0, 0)
            } else {
                (ctx.camera.x, ctx.camera.y)
            };
            ctx.canvas.draw(DrawCommand::Text {
                font_id: label.font_id.clone(),
                text: label.text.clone(),
                x: label.position.x as i32 - cam_x,
                y: label.position.y as i32 - cam_y,
                color: label.color,
            });
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

/// Bar color for the given health: red up to a third, yellow up to half,
/// green above.
pub fn health_color(health: &Health) -> Color {
    if health.current <= health.max / 3 {
        Color::RED
    } else if health.current <= health.max / 2 {
        Color::YELLOW
    } else {
        Color::GREEN
    }
}

/// Draws a health bar and the health number next to each damageable sprite.
#[derive(Debug, Default)]
pub struct RenderHealthBarSystem;

impl RenderHealthBarSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for RenderHealthBarSystem {
    fn name(&self) -> &str {
        "render_health_bar"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<Transform>().with::<Sprite>().with::<Health>();
    }

    fn render(
        &mut self,
        entities: &[Entity],
        registry: &Registry,
        ctx: &mut RenderContext<'_>,
    ) -> Result<()> {
        for &entity in entities {
            let (Ok(transform), Ok(sprite), Ok(health)) = (
                registry.get_component::<Transform>(entity),
                registry.get_component::<Sprite>(entity),
                registry.get_component::<Health>(entity),
            ) else {
                continue;
            };
            let color = health_color(health);

            let x = (transform.position.x + sprite.width as f64 * transform.scale.x) as i32
                - ctx.camera.x;
            let y = transform.position.y as i32 - ctx.camera.y;
            let width = HEALTH_BAR_WIDTH * health.current.max(0) / health.max.max(1);
            ctx.canvas.draw(DrawCommand::Rect {
                rect: Rect::new(x, y, width, HEALTH_BAR_HEIGHT),
                color,
                filled: true,
            });

            if ctx.assets.font(HEALTH_FONT).is_some() {
                ctx.canvas.draw(DrawCommand::Text {
                    font_id: HEALTH_FONT.to_owned(),
                    text: health.current.to_string(),
                    x,
                    y: y + 5,
                    color,
                });
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
