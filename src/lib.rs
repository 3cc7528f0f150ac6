pub mod assets;
pub mod components;
pub mod config;
pub mod ecs;
pub mod engine;
pub mod events;
pub mod level;
pub mod logging;
pub mod render;
pub mod systems;

pub use config::Config;
pub use ecs::{EcsError, Entity, EventBus, Registry};
pub use engine::{Engine, EngineBuilder, FrameSummary};
