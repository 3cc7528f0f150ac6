use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

use crate::ecs::Component;
use crate::render::{Color, Flip, Rect};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2::new(0.0, 0.0);
    pub const ONE: Vec2 = Vec2::new(1.0, 1.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub scale: Vec2,
    /// Degrees, clockwise.
    pub rotation: f64,
}

impl Transform {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
        }
    }
}

impl Component for Transform {}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rigidbody {
    pub velocity: Vec2,
}

impl Rigidbody {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            velocity: Vec2::new(x, y),
        }
    }
}

impl Component for Rigidbody {}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub asset_id: String,
    pub width: u32,
    pub height: u32,
    pub z_index: i32,
    /// Fixed sprites are drawn in screen space and ignore the camera.
    pub fixed: bool,
    pub flip: Flip,
    /// Region of the texture to draw; animation and steering move it around
    /// the sprite sheet.
    pub src: Rect,
}

impl Sprite {
    pub fn new(asset_id: impl Into<String>, width: u32, height: u32, z_index: i32) -> Self {
        Self {
            asset_id: asset_id.into(),
            width,
            height,
            z_index,
            fixed: false,
            flip: Flip::None,
            src: Rect::new(0, 0, width as i32, height as i32),
        }
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    pub fn with_src_origin(mut self, x: i32, y: i32) -> Self {
        self.src.x = x;
        self.src.y = y;
        self
    }
}

impl Component for Sprite {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub num_frames: u32,
    pub current_frame: u32,
    /// Frames per second.
    pub frame_rate: u32,
    pub looping: bool,
    pub start_ms: u64,
}

impl Animation {
    pub fn new(num_frames: u32, frame_rate: u32, looping: bool, start_ms: u64) -> Self {
        Self {
            num_frames: num_frames.max(1),
            current_frame: 0,
            frame_rate,
            looping,
            start_ms,
        }
    }
}

impl Component for Animation {}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxCollider {
    pub width: u32,
    pub height: u32,
    pub offset: Vec2,
}

impl BoxCollider {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            offset: Vec2::ZERO,
        }
    }

    /// World-space box for an entity at `transform`.
    pub fn bounds(&self, transform: &Transform) -> (Vec2, Vec2) {
        let origin = transform.position + self.offset;
        let size = Vec2::new(
            self.width as f64 * transform.scale.x,
            self.height as f64 * transform.scale.y,
        );
        (origin, size)
    }
}

impl Component for BoxCollider {}

/// Velocity to switch to for each steering direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeyboardControlled {
    pub up: Vec2,
    pub right: Vec2,
    pub down: Vec2,
    pub left: Vec2,
}

impl KeyboardControlled {
    /// Same speed in every direction.
    pub fn uniform(speed: f64) -> Self {
        Self {
            up: Vec2::new(0.0, -speed),
            right: Vec2::new(speed, 0.0),
            down: Vec2::new(0.0, speed),
            left: Vec2::new(-speed, 0.0),
        }
    }
}

impl Component for KeyboardControlled {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraFollow;

impl Component for CameraFollow {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileEmitter {
    pub velocity: Vec2,
    pub repeat_ms: u64,
    pub duration_ms: u64,
    pub damage: i32,
    pub friendly: bool,
    /// Manual emitters fire on the shoot key instead of on a timer.
    pub manual: bool,
    pub last_emission_ms: u64,
}

impl Default for ProjectileEmitter {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            repeat_ms: 1_000,
            duration_ms: 10_000,
            damage: 10,
            friendly: false,
            manual: false,
            last_emission_ms: 0,
        }
    }
}

impl Component for ProjectileEmitter {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub max: i32,
    pub current: i32,
}

impl Health {
    pub fn full(max: i32) -> Self {
        Self { max, current: max }
    }

    pub fn ratio(&self) -> f64 {
        if self.max <= 0 {
            return 0.0;
        }
        self.current as f64 / self.max as f64
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::full(100)
    }
}

impl Component for Health {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projectile {
    pub friendly: bool,
    pub damage: i32,
    pub duration_ms: u64,
    pub start_ms: u64,
}

impl Component for Projectile {}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub position: Vec2,
    pub text: String,
    pub font_id: String,
    pub color: Color,
    pub fixed: bool,
}

impl Component for TextLabel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collider_bounds_follow_scale_and_offset() {
        let transform = Transform {
            position: Vec2::new(10.0, 20.0),
            scale: Vec2::new(2.0, 1.0),
            rotation: 0.0,
        };
        let collider = BoxCollider {
            width: 8,
            height: 4,
            offset: Vec2::new(1.0, -1.0),
        };

        let (origin, size) = collider.bounds(&transform);
        assert_eq!(origin, Vec2::new(11.0, 19.0));
        assert_eq!(size, Vec2::new(16.0, 4.0));
    }

    #[test]
    fn test_sprite_src_defaults_to_first_cell() {
        let sprite = Sprite::new("chopper", 32, 32, 2).with_src_origin(0, 64);
        assert_eq!(sprite.src, Rect::new(0, 64, 32, 32));
        assert!(!sprite.fixed);
    }

    #[test]
    fn test_health_ratio() {
        let mut health = Health::full(50);
        health.current = 10;
        assert!((health.ratio() - 0.2).abs() < f64::EPSILON);
        assert_eq!(Health { max: 0, current: 0 }.ratio(), 0.0);
    }
}
