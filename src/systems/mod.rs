mod animation;
mod camera;
mod collision;
mod damage;
mod keyboard;
mod movement;
mod projectile;
mod render;

pub use animation::{frame_at, AnimationSystem};
pub use camera::CameraMovementSystem;
pub use collision::{aabb_overlap, CollisionSystem};
pub use damage::{DamageStats, DamageSystem};
pub use keyboard::KeyboardControlSystem;
pub use movement::MovementSystem;
pub use projectile::{ProjectileEmitSystem, ProjectileLifecycleSystem, BULLET_ASSET, SHOOT_KEY};
pub use render::{
    health_color, RenderColliderSystem, RenderHealthBarSystem, RenderSystem, RenderTextSystem,
    HEALTH_FONT,
};

pub const PLAYER_TAG: &str = "player";
pub const ENEMIES_GROUP: &str = "enemies";
pub const OBSTACLES_GROUP: &str = "obstacles";
pub const PROJECTILES_GROUP: &str = "projectiles";
pub const TILES_GROUP: &str = "tiles";
